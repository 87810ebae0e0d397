//! Supabase Storage backend
//!
//! Talks to the Storage REST API (`/storage/v1/object/...`) with the caller's
//! bearer token so bucket policies apply per user.

use crate::keys::validate_object_path;
use crate::traits::{ObjectStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Characters left unescaped in a path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Supabase Storage implementation
#[derive(Clone)]
pub struct SupabaseObjectStore {
    client: Client,
    project_url: String,
    anon_key: String,
    bucket: String,
    signed_url_ttl: Duration,
}

impl SupabaseObjectStore {
    /// Create a new SupabaseObjectStore instance
    ///
    /// # Arguments
    /// * `project_url` - Project base URL (e.g., "https://xyz.supabase.co")
    /// * `anon_key` - Project anon key, sent as the `apikey` header
    /// * `bucket` - Storage bucket holding the images
    /// * `signed_url_ttl` - Lifetime of the download URLs issued by `create_signed_url`
    pub fn new(
        project_url: impl Into<String>,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
        signed_url_ttl: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            project_url: project_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            bucket: bucket.into(),
            signed_url_ttl,
        })
    }

    fn encode_path(path: &str) -> String {
        path.split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.project_url,
            self.bucket,
            Self::encode_path(path)
        )
    }

    fn sign_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.project_url,
            self.bucket,
            Self::encode_path(path)
        )
    }

    /// Supabase answers with a path relative to `/storage/v1`; make it absolute.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_string();
        }
        if signed.starts_with('/') {
            format!("{}/storage/v1{}", self.project_url, signed)
        } else {
            format!("{}/storage/v1/{}", self.project_url, signed)
        }
    }

    async fn error_body(response: reqwest::Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn create_signed_url(&self, path: &str, bearer: &str) -> StorageResult<String> {
        validate_object_path(path)?;
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.sign_url(path))
            .bearer_auth(bearer)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "expiresIn": self.signed_url_ttl.as_secs() }))
            .timeout(SIGN_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StorageError::SignFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(
                status = %status,
                bucket = %self.bucket,
                key = %path,
                body = %body,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Supabase sign failed"
            );
            return Err(StorageError::SignFailed(format!(
                "Supabase sign failed: {}",
                status
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::SignFailed(format!("Invalid sign response: {}", e)))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase signed URL issued"
        );

        Ok(self.absolute_signed_url(&signed.signed_url))
    }

    async fn delete_object(&self, path: &str, bearer: &str) -> StorageResult<()> {
        validate_object_path(path)?;
        let start = std::time::Instant::now();

        let response = self
            .client
            .delete(self.object_url(path))
            .bearer_auth(bearer)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(
                status = %status,
                bucket = %self.bucket,
                key = %path,
                body = %body,
                "Supabase delete failed"
            );
            return Err(StorageError::DeleteFailed(format!(
                "Supabase delete failed: {}",
                status
            )));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase delete successful"
        );

        Ok(())
    }

    async fn upload_object(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        bearer: &str,
    ) -> StorageResult<()> {
        validate_object_path(path)?;
        let size = data.len() as u64;
        let content_type = if content_type.trim().is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        let start = std::time::Instant::now();

        let response = self
            .client
            .put(self.object_url(path))
            .bearer_auth(bearer)
            .header("apikey", &self.anon_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::error!(
                status = %status,
                bucket = %self.bucket,
                key = %path,
                size_bytes = size,
                body = %body,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Supabase upload failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "Supabase upload failed: {}",
                status
            )));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Supabase upload successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Supabase
    }
}
