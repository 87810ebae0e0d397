//! Object storage abstraction trait
//!
//! This module defines the ObjectStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object path: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for metadetect_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => {
                metadetect_core::AppError::NotFound(format!("Object not found: {}", path))
            }
            StorageError::InvalidKey(msg) => metadetect_core::AppError::InvalidInput(msg),
            other => metadetect_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Object storage abstraction trait
///
/// All storage backends (Supabase, S3, local filesystem) must implement this
/// trait so the services never couple to a specific backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Issue a short-lived URL from which the object at `path` can be downloaded.
    async fn create_signed_url(&self, path: &str, bearer: &str) -> StorageResult<String>;

    /// Delete the object at `path`. Deleting a missing object succeeds.
    async fn delete_object(&self, path: &str, bearer: &str) -> StorageResult<()>;

    /// Store `data` at `path`, replacing any existing object.
    async fn upload_object(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        bearer: &str,
    ) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
