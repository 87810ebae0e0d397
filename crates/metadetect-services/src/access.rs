//! Ownership checks shared by the services.

use metadetect_core::{models::Image, AppError, CallerIdentity, IdentityProvider};
use metadetect_db::{ImageStore, TenantScope};
use uuid::Uuid;

/// Resolve the caller of the current request or fail with `Unauthenticated`.
pub fn require_caller(identity: &dyn IdentityProvider) -> Result<CallerIdentity, AppError> {
    identity
        .current_caller()
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))
}

/// Load an image under `scope` and check that the scope's caller owns it.
///
/// `NotFound` when the image is not visible, `Forbidden` when it is visible
/// but belongs to someone else.
pub async fn require_owned_image(
    images: &dyn ImageStore,
    scope: &TenantScope,
    image_id: Uuid,
) -> Result<Image, AppError> {
    let image = images
        .find_by_id(scope, image_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    if image.owner_id != scope.caller_id() {
        tracing::debug!(
            image_id = %image_id,
            caller_id = %scope.caller_id(),
            "Ownership check failed"
        );
        return Err(AppError::Forbidden("You do not own this image.".to_string()));
    }

    Ok(image)
}
