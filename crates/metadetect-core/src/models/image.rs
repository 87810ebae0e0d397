use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded image owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub storage_path: Option<String>,
    pub labels: Vec<String>,
    pub note: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Image {
    /// The storage path as recorded, if one is recorded and not blank.
    pub fn usable_storage_path(&self) -> Option<&str> {
        self.storage_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }
}

/// Fields supplied when registering a new image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewImage {
    pub filename: String,
    pub storage_path: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub note: Option<String>,
}

/// Partial update of an image. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdate {
    pub filename: Option<String>,
    pub storage_path: Option<String>,
    pub labels: Option<Vec<String>>,
    pub note: Option<String>,
}

impl ImageUpdate {
    /// Applies the update in place. Blank filenames and storage paths are ignored.
    pub fn apply(self, image: &mut Image) {
        if let Some(filename) = self.filename.filter(|f| !f.trim().is_empty()) {
            image.filename = filename;
        }
        if let Some(path) = self.storage_path.filter(|p| !p.trim().is_empty()) {
            image.storage_path = Some(path);
        }
        if let Some(labels) = self.labels {
            image.labels = labels;
        }
        if let Some(note) = self.note {
            image.note = Some(note);
        }
    }
}
