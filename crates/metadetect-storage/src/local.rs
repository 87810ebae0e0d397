use crate::keys::validate_object_path;
use crate::traits::{ObjectStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Characters escaped when a filesystem path is turned into a `file://` URL.
const FILE_URL: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'#').add(b'?');

/// Local filesystem storage implementation
///
/// Signed URLs are plain `file://` URLs; the bearer token is ignored.
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    /// Create a new LocalObjectStore rooted at `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalObjectStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert an object path to a filesystem path with security validation
    fn key_to_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_object_path(path)?;

        let full = self.base_path.join(path);
        if let Ok(canonical) = full.canonicalize() {
            if canonical.strip_prefix(&self.base_path).is_err() {
                return Err(StorageError::InvalidKey(
                    "Object path resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(full)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn create_signed_url(&self, path: &str, _bearer: &str) -> StorageResult<String> {
        let full = self.key_to_path(path)?;
        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let display = full.to_string_lossy();
        Ok(format!("file://{}", utf8_percent_encode(&display, FILE_URL)))
    }

    async fn delete_object(&self, path: &str, _bearer: &str) -> StorageResult<()> {
        let full = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&full).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", full.display(), e))
        })?;

        tracing::info!(
            path = %full.display(),
            key = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn upload_object(
        &self,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
        _bearer: &str,
    ) -> StorageResult<()> {
        let full = self.key_to_path(path)?;
        let size = data.len();

        self.ensure_parent_dir(&full).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&full).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", full.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", full.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", full.display(), e))
        })?;

        tracing::info!(
            path = %full.display(),
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
