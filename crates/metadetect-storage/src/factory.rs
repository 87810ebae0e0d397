#[cfg(feature = "storage-local")]
use crate::LocalObjectStore;
#[cfg(feature = "storage-s3")]
use crate::S3ObjectStore;
#[cfg(feature = "storage-supabase")]
use crate::SupabaseObjectStore;
use crate::{ObjectStore, StorageBackend, StorageError, StorageResult};
use metadetect_core::Config;
use std::sync::Arc;
#[cfg(any(feature = "storage-s3", feature = "storage-supabase"))]
use std::time::Duration;

/// Create an object store based on configuration
pub async fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-supabase")]
        StorageBackend::Supabase => {
            let url = config.supabase_url().ok_or_else(|| {
                StorageError::ConfigError("SUPABASE_URL not configured".to_string())
            })?;
            let anon_key = config.supabase_anon_key().ok_or_else(|| {
                StorageError::ConfigError("SUPABASE_ANON_KEY not configured".to_string())
            })?;

            let storage = SupabaseObjectStore::new(
                url,
                anon_key,
                config.supabase_storage_bucket(),
                Duration::from_secs(config.signed_url_ttl_secs()),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-supabase"))]
        StorageBackend::Supabase => Err(StorageError::ConfigError(
            "Supabase storage backend not available (storage-supabase feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage = S3ObjectStore::new(
                bucket,
                region,
                endpoint,
                Duration::from_secs(config.signed_url_ttl_secs()),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let storage = LocalObjectStore::new(base_path).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
