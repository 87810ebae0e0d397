//! Result of one extraction attempt and its mapping to a terminal state.

use metadetect_core::constants::MAX_ERROR_MESSAGE_CHARS;
use metadetect_core::models::AnalysisCompletion;
use metadetect_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

use super::download::DownloadError;
use crate::c2pa::ExtractorError;

/// Anything that can go wrong between signing the URL and reading the manifest.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extractor(#[from] ExtractorError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Raw manifest text from the extractor.
    Success(String),
    /// Failure message, unbounded.
    Failure(String),
}

impl ExtractionOutcome {
    pub fn from_result<E: std::fmt::Display>(result: Result<String, E>) -> Self {
        match result {
            Ok(manifest) => ExtractionOutcome::Success(manifest),
            Err(e) => ExtractionOutcome::Failure(e.to_string()),
        }
    }

    /// DONE with the manifest, or FAILED with a bounded `{"error": ...}` document.
    pub fn into_completion(self) -> AnalysisCompletion {
        match self {
            ExtractionOutcome::Success(manifest) => AnalysisCompletion::done(manifest),
            ExtractionOutcome::Failure(message) => {
                AnalysisCompletion::failed(error_details(&message))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorDetails<'a> {
    error: &'a str,
}

/// `{"error": <message>}` with the message cut to `MAX_ERROR_MESSAGE_CHARS` characters.
pub fn error_details(message: &str) -> String {
    let message = truncate_chars(message, MAX_ERROR_MESSAGE_CHARS);
    serde_json::to_string(&ErrorDetails { error: message })
        .unwrap_or_else(|_| manual_error_json(message))
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Hand-escaped fallback used if the serializer ever refuses the message.
fn manual_error_json(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 12);
    out.push_str("{\"error\":\"");
    for c in message.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push_str("\"}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadetect_core::models::AnalysisStatus;
    use serde_json::Value;

    #[test]
    fn success_maps_to_done_with_raw_manifest() {
        let manifest = "{ \"c2pa\" : \"ok\" }\n".to_string();
        let completion = ExtractionOutcome::Success(manifest.clone()).into_completion();
        assert_eq!(completion.status, AnalysisStatus::Done);
        assert_eq!(completion.details, manifest);
        assert!(completion.confidence.is_none());
    }

    #[test]
    fn failure_maps_to_failed_error_document() {
        let completion =
            ExtractionOutcome::Failure("boom \"quoted\"\n".to_string()).into_completion();
        assert_eq!(completion.status, AnalysisStatus::Failed);
        let parsed: Value = serde_json::from_str(&completion.details).unwrap();
        assert_eq!(parsed["error"], "boom \"quoted\"\n");
    }

    #[test]
    fn long_messages_are_cut_to_exactly_the_limit() {
        let message = "x".repeat(MAX_ERROR_MESSAGE_CHARS + 500);
        let parsed: Value = serde_json::from_str(&error_details(&message)).unwrap();
        assert_eq!(
            parsed["error"].as_str().unwrap().chars().count(),
            MAX_ERROR_MESSAGE_CHARS
        );

        let short = "y".repeat(MAX_ERROR_MESSAGE_CHARS);
        let parsed: Value = serde_json::from_str(&error_details(&short)).unwrap();
        assert_eq!(parsed["error"].as_str().unwrap(), short);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let message = "é".repeat(MAX_ERROR_MESSAGE_CHARS + 1);
        let parsed: Value = serde_json::from_str(&error_details(&message)).unwrap();
        assert_eq!(
            parsed["error"].as_str().unwrap().chars().count(),
            MAX_ERROR_MESSAGE_CHARS
        );
    }

    #[test]
    fn manual_escaping_produces_valid_json() {
        let message = "back\\slash \"quote\"\r\n\ttab \u{1} bell";
        let parsed: Value = serde_json::from_str(&manual_error_json(message)).unwrap();
        assert_eq!(parsed["error"], message);
    }

    #[test]
    fn from_result_uses_display() {
        let outcome = ExtractionOutcome::from_result::<ExtractorError>(Err(
            ExtractorError::Failed {
                code: Some(1),
                excerpt: "stderr: bad".to_string(),
            },
        ));
        assert_eq!(
            outcome,
            ExtractionOutcome::Failure("C2PA tool failed with exit code 1: stderr: bad".to_string())
        );
    }
}
