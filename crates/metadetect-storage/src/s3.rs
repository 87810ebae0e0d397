use crate::keys::validate_object_path;
use crate::traits::{ObjectStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload};
use std::time::{Duration, Instant};

/// S3 (or S3-compatible) object storage.
///
/// Access is governed by the service credentials from the environment
/// (`AWS_ACCESS_KEY_ID`, ...); the caller's bearer token is not forwarded.
#[derive(Clone)]
pub struct S3ObjectStore {
    store: AmazonS3,
    bucket: String,
    signed_url_ttl: Duration,
}

impl S3ObjectStore {
    /// `endpoint_url` points at an S3-compatible provider, e.g.
    /// `http://localhost:9000` for MinIO. Presigned GET URLs live for
    /// `signed_url_ttl`.
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        signed_url_ttl: Duration,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let plain_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(plain_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3ObjectStore {
            store,
            bucket,
            signed_url_ttl,
        })
    }

    fn location(path: &str) -> StorageResult<Path> {
        validate_object_path(path)?;
        Ok(Path::from(path))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_signed_url(&self, path: &str, _bearer: &str) -> StorageResult<String> {
        let location = Self::location(path)?;
        let url = self
            .store
            .signed_url(Method::GET, &location, self.signed_url_ttl)
            .await
            .map_err(|e| StorageError::SignFailed(e.to_string()))?;
        tracing::debug!(bucket = %self.bucket, key = %path, "S3 URL presigned");
        Ok(url.to_string())
    }

    async fn delete_object(&self, path: &str, _bearer: &str) -> StorageResult<()> {
        let location = Self::location(path)?;
        let start = Instant::now();

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %path,
                    duration_ms = elapsed_ms(start),
                    "S3 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, bucket = %self.bucket, key = %path, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn upload_object(
        &self,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
        _bearer: &str,
    ) -> StorageResult<()> {
        let location = Self::location(path)?;
        let size_bytes = data.len();
        let start = Instant::now();

        if let Err(e) = self
            .store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await
        {
            tracing::error!(error = %e, bucket = %self.bucket, key = %path, size_bytes, "S3 upload failed");
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes,
            duration_ms = elapsed_ms(start),
            "S3 upload successful"
        );
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
