//! Fetching the artifact behind a signed URL into a local temp file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use metadetect_core::constants::{FALLBACK_FILE_SUFFIX, MAX_FILE_SUFFIX_LEN};
use metadetect_core::Config;
use percent_encoding::percent_decode_str;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("unsupported download URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("download request failed: {0}")]
    Request(String),

    #[error("download failed with HTTP status {0}")]
    Status(u16),

    #[error("download exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("download timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("downloaded file is empty")]
    Empty,

    #[error("I/O error during download: {0}")]
    Io(#[from] std::io::Error),
}

/// Temp file suffix for an object path: its extension when it is a dot
/// followed by ASCII letters/digits and at most `MAX_FILE_SUFFIX_LEN` long
/// (dot included), else `.bin`.
pub fn temp_file_suffix(storage_path: &str) -> String {
    let name = storage_path.rsplit('/').next().unwrap_or(storage_path);
    let ext = match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => return FALLBACK_FILE_SUFFIX.to_string(),
    };
    let valid = ext.len() >= 2
        && ext.len() <= MAX_FILE_SUFFIX_LEN
        && ext[1..].chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        ext.to_string()
    } else {
        FALLBACK_FILE_SUFFIX.to_string()
    }
}

/// Downloads `http`, `https` and `file` URLs into request-local temp files.
///
/// The returned [`NamedTempFile`] deletes itself when dropped.
#[derive(Debug, Clone)]
pub struct ArtifactDownloader {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
    temp_dir: Option<PathBuf>,
}

impl ArtifactDownloader {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DownloadError::Request(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            max_bytes,
            temp_dir: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DownloadError> {
        Self::new(
            Duration::from_secs(config.download_timeout_secs()),
            config.max_download_bytes(),
        )
    }

    /// Create temp files in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    #[tracing::instrument(skip(self, url), fields(storage_path = %storage_path))]
    pub async fn download_to_temp(
        &self,
        url: &str,
        storage_path: &str,
    ) -> Result<NamedTempFile, DownloadError> {
        let start = Instant::now();
        let suffix = temp_file_suffix(storage_path);
        let mut builder = tempfile::Builder::new();
        builder.prefix("metadetect-").suffix(&suffix);
        let temp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let file = tokio::fs::File::from_std(temp.as_file().try_clone()?);
        let written = tokio::time::timeout(self.timeout, self.fetch_into(url, file))
            .await
            .map_err(|_| DownloadError::Timeout(self.timeout))??;

        if written == 0 {
            return Err(DownloadError::Empty);
        }

        tracing::debug!(
            size_bytes = written,
            path = %temp.path().display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact downloaded"
        );

        Ok(temp)
    }

    async fn fetch_into(&self, url: &str, mut file: tokio::fs::File) -> Result<u64, DownloadError> {
        let written = if let Some(rest) = url.strip_prefix("file://") {
            self.copy_local(rest, &mut file).await?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.stream_http(url, &mut file).await?
        } else {
            let scheme = url.split(':').next().unwrap_or_default().to_string();
            return Err(DownloadError::UnsupportedScheme(scheme));
        };

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    async fn copy_local(&self, encoded_path: &str, file: &mut tokio::fs::File) -> Result<u64, DownloadError> {
        let path = percent_decode_str(encoded_path).decode_utf8_lossy().into_owned();
        let mut source = tokio::fs::File::open(&path).await?;
        let len = source.metadata().await?.len();
        if len > self.max_bytes {
            return Err(DownloadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(tokio::io::copy(&mut source, file).await?)
    }

    async fn stream_http(&self, url: &str, file: &mut tokio::fs::File) -> Result<u64, DownloadError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(DownloadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadError::Request(e.without_url().to_string()))?
        {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        Ok(written)
    }
}
