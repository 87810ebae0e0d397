use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use metadetect_core::models::{ImageUpdate, NewImage};
use uuid::Uuid;

use super::print_json;
use crate::wiring::App;

#[derive(Subcommand)]
pub enum ImageCommands {
    /// List your images, newest first
    List,
    /// Get a single image by ID
    Get {
        /// Image UUID
        id: Uuid,
    },
    /// Register a new image
    Create {
        /// Original filename
        filename: String,
        /// Label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long)]
        note: Option<String>,
        /// Existing object path in storage
        #[arg(long)]
        storage_path: Option<String>,
    },
    /// Update image fields; labels are replaced when any are given
    Update {
        /// Image UUID
        id: Uuid,
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        storage_path: Option<String>,
        /// Label (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Upload the file contents of an image to storage
    Upload {
        /// Image UUID
        id: Uuid,
        /// Path to the file to upload
        file: PathBuf,
        /// Content type (guessed from the extension when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete an image and its stored object
    Delete {
        /// Image UUID
        id: Uuid,
    },
}

/// Content type from a file extension, `application/octet-stream` if unknown.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("heic") => "image/heic",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

pub async fn run(app: &App, command: ImageCommands) -> Result<()> {
    match command {
        ImageCommands::List => print_json(&app.images.list().await?),
        ImageCommands::Get { id } => print_json(&app.images.get(id).await?),
        ImageCommands::Create {
            filename,
            labels,
            note,
            storage_path,
        } => {
            let image = app
                .images
                .create(NewImage {
                    filename,
                    storage_path,
                    labels,
                    note,
                })
                .await?;
            print_json(&image)
        }
        ImageCommands::Update {
            id,
            filename,
            storage_path,
            labels,
            note,
        } => {
            let update = ImageUpdate {
                filename,
                storage_path,
                labels: (!labels.is_empty()).then_some(labels),
                note,
            };
            print_json(&app.images.update(id, update).await?)
        }
        ImageCommands::Upload {
            id,
            file,
            content_type,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content_type = content_type.unwrap_or_else(|| content_type_for(&file).to_string());
            print_json(&app.images.upload(id, data, &content_type).await?)
        }
        ImageCommands::Delete { id } => {
            app.images.delete(id).await?;
            print_json(&serde_json::json!({ "success": true, "message": format!("Image {} deleted", id) }))
        }
    }
}
