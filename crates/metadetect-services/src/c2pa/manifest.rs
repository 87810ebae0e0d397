//! Reading the manifest store printed by `c2patool -d`.
//!
//! The stored manifest is never rewritten; this only picks out the entry a
//! human usually wants to look at.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("manifest store contains no manifests")]
    NoManifest,
}

/// Returns the active manifest of a manifest store.
///
/// Accepts both layouts c2patool produces: `manifests` as an array (first
/// entry wins) or as a map keyed by label (the `active_manifest` entry, else
/// the first one).
pub fn manifest_summary(manifest_json: &str) -> Result<Value, ManifestError> {
    let root: Value = serde_json::from_str(manifest_json)?;

    match root.get("manifests") {
        Some(Value::Array(entries)) => entries.first().cloned().ok_or(ManifestError::NoManifest),
        Some(Value::Object(entries)) => {
            let active = root
                .get("active_manifest")
                .and_then(Value::as_str)
                .and_then(|label| entries.get(label));
            active
                .or_else(|| entries.values().next())
                .cloned()
                .ok_or(ManifestError::NoManifest)
        }
        _ => Err(ManifestError::NoManifest),
    }
}
