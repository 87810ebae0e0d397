//! Configuration module
//!
//! This module provides configuration structures for the MetaDetect services,
//! including database, object storage, extractor and download settings.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SIGNED_URL_TTL_SECS: u64 = 600;
const C2PA_TIMEOUT_SECS: u64 = 15;
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;
const MAX_DOWNLOAD_MB: u64 = 50;
const DEFAULT_C2PA_TOOL_PATH: &str = "tools/c2patool/c2patool";
const DEFAULT_SUPABASE_BUCKET: &str = "images";

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// `json` switches the log formatter to JSON lines
    pub log_format: Option<String>,
}

/// MetaDetect configuration
#[derive(Clone, Debug)]
pub struct MetaDetectConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub supabase_storage_bucket: String,
    pub signed_url_ttl_secs: u64,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    // Extraction pipeline
    pub c2pa_tool_path: String,
    pub c2pa_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub max_download_bytes: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MetaDetectConfig>);

impl Config {
    fn inner(&self) -> &MetaDetectConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = MetaDetectConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> Option<&str> {
        self.inner().base.log_format.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn supabase_url(&self) -> Option<&str> {
        self.inner().supabase_url.as_deref()
    }

    pub fn supabase_anon_key(&self) -> Option<&str> {
        self.inner().supabase_anon_key.as_deref()
    }

    pub fn supabase_storage_bucket(&self) -> &str {
        &self.inner().supabase_storage_bucket
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.inner().signed_url_ttl_secs
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn c2pa_tool_path(&self) -> &str {
        &self.inner().c2pa_tool_path
    }

    pub fn c2pa_timeout_secs(&self) -> u64 {
        self.inner().c2pa_timeout_secs
    }

    pub fn download_timeout_secs(&self) -> u64 {
        self.inner().download_timeout_secs
    }

    pub fn max_download_bytes(&self) -> u64 {
        self.inner().max_download_bytes
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

impl MetaDetectConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup and validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let base = BaseConfig {
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(lookup("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
            environment: lookup("ENVIRONMENT")
                .or_else(|| lookup("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            log_format: non_empty("LOG_FORMAT").map(|s| s.to_lowercase()),
        };

        let storage_backend = match non_empty("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Supabase,
        };

        let max_download_mb = parse_or(lookup("MAX_DOWNLOAD_MB"), MAX_DOWNLOAD_MB);

        let config = MetaDetectConfig {
            base,
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            supabase_url: non_empty("SUPABASE_URL")
                .map(|s| s.trim_end_matches('/').to_string()),
            supabase_anon_key: non_empty("SUPABASE_ANON_KEY"),
            supabase_storage_bucket: non_empty("SUPABASE_STORAGE_BUCKET")
                .unwrap_or_else(|| DEFAULT_SUPABASE_BUCKET.to_string()),
            signed_url_ttl_secs: parse_or(lookup("SIGNED_URL_TTL_SECONDS"), SIGNED_URL_TTL_SECS),
            s3_bucket: non_empty("S3_BUCKET"),
            s3_region: non_empty("S3_REGION").or_else(|| non_empty("AWS_REGION")),
            s3_endpoint: non_empty("S3_ENDPOINT"),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            c2pa_tool_path: non_empty("C2PA_TOOL_PATH")
                .unwrap_or_else(|| DEFAULT_C2PA_TOOL_PATH.to_string()),
            c2pa_timeout_secs: parse_or(lookup("C2PA_TIMEOUT_SECS"), C2PA_TIMEOUT_SECS),
            download_timeout_secs: parse_or(lookup("DOWNLOAD_TIMEOUT_SECS"), DOWNLOAD_TIMEOUT_SECS),
            max_download_bytes: max_download_mb.saturating_mul(1024 * 1024),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.c2pa_timeout_secs == 0 {
            return Err(anyhow::anyhow!("C2PA_TIMEOUT_SECS must be greater than 0"));
        }

        if self.download_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "DOWNLOAD_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.max_download_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOWNLOAD_MB must be greater than 0"));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::Supabase => {
                if self.supabase_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "SUPABASE_URL must be set when using Supabase storage backend"
                    ));
                }
                if self.supabase_anon_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "SUPABASE_ANON_KEY must be set when using Supabase storage backend"
                    ));
                }
            }
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
