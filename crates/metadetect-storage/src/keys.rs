//! Shared object path generation and validation for storage backends.

use uuid::Uuid;

use crate::{StorageError, StorageResult};

/// Object path for an uploaded image: `{owner_id}/{image_id}--{filename}`.
///
/// Path separators and `..` in `filename` are replaced so the object stays
/// directly under the owner's prefix.
pub fn image_object_path(owner_id: Uuid, image_id: Uuid, filename: &str) -> String {
    let name = filename
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect::<String>()
        .replace("..", "_");
    let name = if name.is_empty() { "upload".to_string() } else { name };
    format!("{}/{}--{}", owner_id, image_id, name)
}

/// Reject paths that are empty, absolute or contain traversal sequences.
pub fn validate_object_path(path: &str) -> StorageResult<()> {
    if path.trim().is_empty() {
        return Err(StorageError::InvalidKey("Object path is empty".to_string()));
    }
    if path.contains("..") || path.starts_with('/') || path.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Object path contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
