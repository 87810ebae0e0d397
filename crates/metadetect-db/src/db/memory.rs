//! In-memory repositories
//!
//! Apply the same visibility rules as the row-level security policies: an
//! image is visible to its owner only, an analysis is visible when its image
//! is. Used by tests and local tooling that run without Postgres.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use metadetect_core::models::{AnalysisCompletion, AnalysisRecord, Image};
use metadetect_core::AppError;
use uuid::Uuid;

use super::stores::{AnalysisStore, ImageStore};
use super::tenant::TenantScope;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Image rows keyed by id.
#[derive(Clone, Default)]
pub struct InMemoryImageStore {
    images: Arc<Mutex<HashMap<Uuid, Image>>>,
    bypass_row_security: bool,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that returns every row regardless of owner, like a connection
    /// whose role bypasses row-level security.
    pub fn without_row_security() -> Self {
        Self {
            images: Arc::default(),
            bypass_row_security: true,
        }
    }

    /// Insert a row without any visibility check.
    pub fn seed(&self, image: Image) {
        lock(&self.images).insert(image.id, image);
    }

    /// Raw lookup without any visibility check.
    pub fn get(&self, id: Uuid) -> Option<Image> {
        lock(&self.images).get(&id).cloned()
    }

    fn is_visible(&self, scope: &TenantScope, image: &Image) -> bool {
        self.bypass_row_security || image.owner_id == scope.caller_id()
    }

    fn visible_image(&self, scope: &TenantScope, id: Uuid) -> Option<Image> {
        lock(&self.images)
            .get(&id)
            .filter(|image| self.is_visible(scope, image))
            .cloned()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<Image>, AppError> {
        Ok(self.visible_image(scope, id))
    }

    async fn list_for_owner(&self, scope: &TenantScope) -> Result<Vec<Image>, AppError> {
        let mut images: Vec<Image> = lock(&self.images)
            .values()
            .filter(|image| image.owner_id == scope.caller_id())
            .cloned()
            .collect();
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(images)
    }

    async fn insert(&self, scope: &TenantScope, image: &Image) -> Result<(), AppError> {
        if !self.is_visible(scope, image) {
            return Err(AppError::Forbidden(
                "new row violates row-level security policy for table \"images\"".to_string(),
            ));
        }
        let mut images = lock(&self.images);
        if images.contains_key(&image.id) {
            return Err(AppError::Conflict(format!("Image {} already exists", image.id)));
        }
        images.insert(image.id, image.clone());
        Ok(())
    }

    async fn update(&self, scope: &TenantScope, image: &Image) -> Result<Image, AppError> {
        let mut images = lock(&self.images);
        match images.get_mut(&image.id) {
            Some(existing) if self.is_visible(scope, existing) => {
                existing.filename = image.filename.clone();
                existing.storage_path = image.storage_path.clone();
                existing.labels = image.labels.clone();
                existing.note = image.note.clone();
                Ok(existing.clone())
            }
            _ => Err(AppError::NotFound("Image not found".to_string())),
        }
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<bool, AppError> {
        let mut images = lock(&self.images);
        let visible = images
            .get(&id)
            .map(|image| self.is_visible(scope, image))
            .unwrap_or(false);
        if visible {
            images.remove(&id);
        }
        Ok(visible)
    }
}

/// Analysis rows in insertion order. Visibility follows the image store.
#[derive(Clone)]
pub struct InMemoryAnalysisStore {
    images: InMemoryImageStore,
    records: Arc<Mutex<Vec<AnalysisRecord>>>,
}

impl InMemoryAnalysisStore {
    pub fn new(images: InMemoryImageStore) -> Self {
        Self {
            images,
            records: Arc::default(),
        }
    }

    /// Insert a row without any visibility check.
    pub fn seed(&self, record: AnalysisRecord) {
        lock(&self.records).push(record);
    }

    /// Raw snapshot of every row, in insertion order.
    pub fn all(&self) -> Vec<AnalysisRecord> {
        lock(&self.records).clone()
    }

    fn image_visible(&self, scope: &TenantScope, image_id: Uuid) -> bool {
        self.images.visible_image(scope, image_id).is_some()
    }

    fn newest_first(&self, scope: &TenantScope, image_id: Uuid) -> Vec<AnalysisRecord> {
        if !self.image_visible(scope, image_id) {
            return Vec::new();
        }
        let mut records: Vec<AnalysisRecord> = lock(&self.records)
            .iter()
            .rev()
            .filter(|record| record.image_id == image_id)
            .cloned()
            .collect();
        // Stable sort keeps later inserts ahead on equal timestamps.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn insert(&self, scope: &TenantScope, record: &AnalysisRecord) -> Result<(), AppError> {
        if !self.image_visible(scope, record.image_id) {
            return Err(AppError::Forbidden(
                "new row violates row-level security policy for table \"analysis_reports\""
                    .to_string(),
            ));
        }
        let mut records = lock(&self.records);
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(AppError::Conflict(format!(
                "Analysis {} already exists",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        let record = lock(&self.records)
            .iter()
            .find(|record| record.id == id)
            .cloned();
        Ok(record.filter(|record| self.image_visible(scope, record.image_id)))
    }

    async fn complete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        completion: &AnalysisCompletion,
    ) -> Result<(), AppError> {
        let image_id = lock(&self.records)
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.image_id);
        let applied = match image_id {
            Some(image_id) if self.image_visible(scope, image_id) => lock(&self.records)
                .iter_mut()
                .find(|record| record.id == id)
                .map(|record| record.complete(completion))
                .unwrap_or(false),
            _ => false,
        };
        if applied {
            Ok(())
        } else {
            Err(AppError::Conflict(format!("Analysis {} is not pending", id)))
        }
    }

    async fn list_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Vec<AnalysisRecord>, AppError> {
        Ok(self.newest_first(scope, image_id))
    }

    async fn latest_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        Ok(self.newest_first(scope, image_id).into_iter().next())
    }
}
