use async_trait::async_trait;
use metadetect_core::{models::Image, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::stores::ImageStore;
use super::tenant::{TenantContext, TenantScope};

/// Repository for the `images` table
#[derive(Clone)]
pub struct ImageRepository {
    tenants: TenantContext,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tenants: TenantContext::new(pool),
        }
    }
}

#[async_trait]
impl ImageStore for ImageRepository {
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<Image>, AppError> {
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let image = sqlx::query_as::<Postgres, Image>(
                        r#"
                        SELECT id, owner_id, filename, storage_path, labels, note, uploaded_at
                        FROM images
                        WHERE id = $1
                        "#,
                    )
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;

                    Ok(image)
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list_for_owner(&self, scope: &TenantScope) -> Result<Vec<Image>, AppError> {
        let owner_id = scope.caller_id();
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let images = sqlx::query_as::<Postgres, Image>(
                        r#"
                        SELECT id, owner_id, filename, storage_path, labels, note, uploaded_at
                        FROM images
                        WHERE owner_id = $1
                        ORDER BY uploaded_at DESC
                        "#,
                    )
                    .bind(owner_id)
                    .fetch_all(&mut *conn)
                    .await?;

                    Ok(images)
                })
            })
            .await
    }

    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "insert", db.record_id = %image.id))]
    async fn insert(&self, scope: &TenantScope, image: &Image) -> Result<(), AppError> {
        let image = image.clone();
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"
                        INSERT INTO images (id, owner_id, filename, storage_path, labels, note, uploaded_at)
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(image.id)
                    .bind(image.owner_id)
                    .bind(&image.filename)
                    .bind(&image.storage_path)
                    .bind(&image.labels)
                    .bind(&image.note)
                    .bind(image.uploaded_at)
                    .execute(&mut *conn)
                    .await?;

                    Ok(())
                })
            })
            .await
    }

    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "update", db.record_id = %image.id))]
    async fn update(&self, scope: &TenantScope, image: &Image) -> Result<Image, AppError> {
        let image = image.clone();
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let updated = sqlx::query_as::<Postgres, Image>(
                        r#"
                        UPDATE images
                        SET filename = $2, storage_path = $3, labels = $4, note = $5
                        WHERE id = $1
                        RETURNING id, owner_id, filename, storage_path, labels, note, uploaded_at
                        "#,
                    )
                    .bind(image.id)
                    .bind(&image.filename)
                    .bind(&image.storage_path)
                    .bind(&image.labels)
                    .bind(&image.note)
                    .fetch_optional(&mut *conn)
                    .await?;

                    updated.ok_or_else(|| AppError::NotFound("Image not found".to_string()))
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<bool, AppError> {
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let result = sqlx::query("DELETE FROM images WHERE id = $1")
                        .bind(id)
                        .execute(&mut *conn)
                        .await?;

                    Ok(result.rows_affected() > 0)
                })
            })
            .await
    }
}
