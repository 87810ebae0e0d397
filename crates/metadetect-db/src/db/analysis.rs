use async_trait::async_trait;
use metadetect_core::models::{AnalysisCompletion, AnalysisRecord, AnalysisStatus};
use metadetect_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::stores::AnalysisStore;
use super::tenant::{TenantContext, TenantScope};

/// Repository for the `analysis_reports` table
#[derive(Clone)]
pub struct AnalysisRepository {
    tenants: TenantContext,
}

impl AnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tenants: TenantContext::new(pool),
        }
    }
}

#[async_trait]
impl AnalysisStore for AnalysisRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "analysis_reports", db.operation = "insert", db.record_id = %record.id))]
    async fn insert(&self, scope: &TenantScope, record: &AnalysisRecord) -> Result<(), AppError> {
        let record = record.clone();
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"
                        INSERT INTO analysis_reports (id, image_id, status, confidence, details, created_at)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        "#,
                    )
                    .bind(record.id)
                    .bind(record.image_id)
                    .bind(record.status)
                    .bind(record.confidence)
                    .bind(&record.details)
                    .bind(record.created_at)
                    .execute(&mut *conn)
                    .await?;

                    Ok(())
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_reports", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let record = sqlx::query_as::<Postgres, AnalysisRecord>(
                        r#"
                        SELECT id, image_id, status, confidence, details, created_at
                        FROM analysis_reports
                        WHERE id = $1
                        "#,
                    )
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;

                    Ok(record)
                })
            })
            .await
    }

    #[tracing::instrument(skip(self, completion), fields(db.table = "analysis_reports", db.operation = "update", db.record_id = %id, status = %completion.status))]
    async fn complete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        completion: &AnalysisCompletion,
    ) -> Result<(), AppError> {
        let completion = completion.clone();
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let result = sqlx::query(
                        r#"
                        UPDATE analysis_reports
                        SET status = $2, confidence = $3, details = $4
                        WHERE id = $1 AND status = $5
                        "#,
                    )
                    .bind(id)
                    .bind(completion.status)
                    .bind(completion.confidence)
                    .bind(&completion.details)
                    .bind(AnalysisStatus::Pending)
                    .execute(&mut *conn)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(AppError::Conflict(format!(
                            "Analysis {} is not pending",
                            id
                        )));
                    }

                    Ok(())
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_reports", db.operation = "select"))]
    async fn list_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Vec<AnalysisRecord>, AppError> {
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let records = sqlx::query_as::<Postgres, AnalysisRecord>(
                        r#"
                        SELECT id, image_id, status, confidence, details, created_at
                        FROM analysis_reports
                        WHERE image_id = $1
                        ORDER BY created_at DESC
                        "#,
                    )
                    .bind(image_id)
                    .fetch_all(&mut *conn)
                    .await?;

                    Ok(records)
                })
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_reports", db.operation = "select"))]
    async fn latest_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        self.tenants
            .run_as(scope, move |conn| {
                Box::pin(async move {
                    let record = sqlx::query_as::<Postgres, AnalysisRecord>(
                        r#"
                        SELECT id, image_id, status, confidence, details, created_at
                        FROM analysis_reports
                        WHERE image_id = $1
                        ORDER BY created_at DESC
                        LIMIT 1
                        "#,
                    )
                    .bind(image_id)
                    .fetch_optional(&mut *conn)
                    .await?;

                    Ok(record)
                })
            })
            .await
    }
}
