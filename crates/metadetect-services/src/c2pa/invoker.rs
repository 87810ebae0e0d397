//! External provenance extractor (c2patool)

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metadetect_core::Config;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Longest stderr/stdout excerpt carried in a failure message.
const OUTPUT_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to launch extractor {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("C2PA tool failed with exit code {}: {excerpt}", exit_code_label(.code))]
    Failed { code: Option<i32>, excerpt: String },

    #[error("C2PA tool produced no manifest output")]
    EmptyOutput,

    #[error("C2PA tool timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("I/O error while running extractor: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Reads provenance data from a local file.
#[async_trait]
pub trait ExternalExtractor: Send + Sync {
    /// Returns the manifest text on success.
    async fn extract(&self, path: &Path) -> Result<String, ExtractorError>;
}

/// Runs `<tool> <path> -d` and returns its stdout.
#[derive(Debug, Clone)]
pub struct C2paToolInvoker {
    tool_path: PathBuf,
    timeout: Duration,
}

impl C2paToolInvoker {
    pub fn new(tool_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool_path: tool_path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.c2pa_tool_path(),
            Duration::from_secs(config.c2pa_timeout_secs()),
        )
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn excerpt(label: &str, bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let cut: String = text.chars().take(OUTPUT_EXCERPT_CHARS).collect();
    Some(format!("{}: {}", label, cut))
}

#[async_trait]
impl ExternalExtractor for C2paToolInvoker {
    #[tracing::instrument(skip(self), fields(tool = %self.tool_path.display(), path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let start = Instant::now();

        let mut child = Command::new(&self.tool_path)
            .arg(path)
            .arg("-d")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractorError::Spawn {
                tool: self.tool_path.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let run = async {
            let (status, out, err) =
                tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
            Ok::<_, std::io::Error>((status?, out?, err?))
        };
        let result = tokio::time::timeout(self.timeout, run).await;

        let (status, stdout, stderr) = match result {
            Ok(output) => output?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out extractor");
                }
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Extractor timed out"
                );
                return Err(ExtractorError::Timeout(self.timeout));
            }
        };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !status.success() {
            let parts: Vec<String> = [excerpt("stderr", &stderr), excerpt("stdout", &stdout)]
                .into_iter()
                .flatten()
                .collect();
            let excerpt = if parts.is_empty() {
                "no output".to_string()
            } else {
                parts.join(" | ")
            };
            tracing::warn!(exit_code = ?status.code(), duration_ms, "Extractor failed");
            return Err(ExtractorError::Failed {
                code: status.code(),
                excerpt,
            });
        }

        if stdout.iter().all(u8::is_ascii_whitespace) {
            tracing::warn!(duration_ms, "Extractor exited cleanly without output");
            return Err(ExtractorError::EmptyOutput);
        }

        tracing::debug!(
            manifest_bytes = stdout.len(),
            duration_ms,
            "Extractor finished"
        );

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
