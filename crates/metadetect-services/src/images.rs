//! Image management with ownership checks.

use std::sync::Arc;

use metadetect_core::models::{Image, ImageUpdate, NewImage};
use metadetect_core::{AppError, Clock, IdentityProvider};
use metadetect_db::{ImageStore, TenantScope};
use metadetect_storage::{image_object_path, ObjectStore};
use uuid::Uuid;

use crate::access::{require_caller, require_owned_image};

#[derive(Clone)]
pub struct ImageService {
    identity: Arc<dyn IdentityProvider>,
    images: Arc<dyn ImageStore>,
    storage: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl ImageService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        images: Arc<dyn ImageStore>,
        storage: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            images,
            storage,
            clock,
        }
    }

    fn scope(&self) -> Result<(TenantScope, String), AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        Ok((TenantScope::from(&caller), caller.bearer))
    }

    #[tracing::instrument(skip(self, new_image), fields(filename = %new_image.filename))]
    pub async fn create(&self, new_image: NewImage) -> Result<Image, AppError> {
        let (scope, _) = self.scope()?;
        let filename = new_image.filename.trim();
        if filename.is_empty() {
            return Err(AppError::InvalidInput("Filename must not be empty".to_string()));
        }

        let image = Image {
            id: Uuid::new_v4(),
            owner_id: scope.caller_id(),
            filename: filename.to_string(),
            storage_path: new_image
                .storage_path
                .filter(|path| !path.trim().is_empty()),
            labels: new_image.labels,
            note: new_image.note,
            uploaded_at: self.clock.now(),
        };
        self.images.insert(&scope, &image).await?;

        tracing::info!(image_id = %image.id, "Image created");
        Ok(image)
    }

    pub async fn get(&self, image_id: Uuid) -> Result<Image, AppError> {
        let (scope, _) = self.scope()?;
        require_owned_image(self.images.as_ref(), &scope, image_id).await
    }

    /// The caller's images, newest first.
    pub async fn list(&self) -> Result<Vec<Image>, AppError> {
        let (scope, _) = self.scope()?;
        self.images.list_for_owner(&scope).await
    }

    #[tracing::instrument(skip(self, update), fields(image_id = %image_id))]
    pub async fn update(&self, image_id: Uuid, update: ImageUpdate) -> Result<Image, AppError> {
        let (scope, _) = self.scope()?;
        let mut image = require_owned_image(self.images.as_ref(), &scope, image_id).await?;
        update.apply(&mut image);
        self.images.update(&scope, &image).await
    }

    /// Removes the stored object (best effort) and then the row.
    #[tracing::instrument(skip(self), fields(image_id = %image_id))]
    pub async fn delete(&self, image_id: Uuid) -> Result<(), AppError> {
        let (scope, bearer) = self.scope()?;
        let image = require_owned_image(self.images.as_ref(), &scope, image_id).await?;

        if let Some(path) = image.usable_storage_path() {
            if let Err(e) = self.storage.delete_object(path, &bearer).await {
                tracing::warn!(error = %e, storage_path = %path, "Failed to delete stored object");
            }
        }

        if !self.images.delete(&scope, image_id).await? {
            return Err(AppError::NotFound("Image not found".to_string()));
        }
        tracing::info!("Image deleted");
        Ok(())
    }

    /// Stores `data` under the image's object path and records that path.
    #[tracing::instrument(skip(self, data), fields(image_id = %image_id, size_bytes = data.len()))]
    pub async fn upload(
        &self,
        image_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Image, AppError> {
        let (scope, bearer) = self.scope()?;
        if data.is_empty() {
            return Err(AppError::InvalidInput("Upload is empty".to_string()));
        }
        let mut image = require_owned_image(self.images.as_ref(), &scope, image_id).await?;

        let path = image_object_path(image.owner_id, image.id, &image.filename);
        self.storage
            .upload_object(&path, data, content_type, &bearer)
            .await?;

        image.storage_path = Some(path);
        let image = self.images.update(&scope, &image).await?;
        tracing::info!(storage_path = ?image.storage_path, "Image uploaded");
        Ok(image)
    }
}
