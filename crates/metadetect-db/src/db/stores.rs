//! Persistence seams used by the services.
//!
//! Every method takes the [`TenantScope`] it runs under. Implementations
//! only return rows the scope's caller may see.

use async_trait::async_trait;
use metadetect_core::models::{AnalysisCompletion, AnalysisRecord, Image};
use metadetect_core::AppError;
use uuid::Uuid;

use super::tenant::TenantScope;

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<Image>, AppError>;

    /// The caller's images, newest first.
    async fn list_for_owner(&self, scope: &TenantScope) -> Result<Vec<Image>, AppError>;

    async fn insert(&self, scope: &TenantScope, image: &Image) -> Result<(), AppError>;

    /// Persists every mutable field of `image`. `NotFound` if the row is not visible.
    async fn update(&self, scope: &TenantScope, image: &Image) -> Result<Image, AppError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Persists a new record. The write is committed when this returns.
    async fn insert(&self, scope: &TenantScope, record: &AnalysisRecord) -> Result<(), AppError>;

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError>;

    /// Moves a PENDING record to its terminal state.
    ///
    /// Fails with `Conflict` when no PENDING record with this id is visible.
    async fn complete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        completion: &AnalysisCompletion,
    ) -> Result<(), AppError>;

    /// All analyses of an image, newest first.
    async fn list_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Vec<AnalysisRecord>, AppError>;

    async fn latest_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError>;
}
