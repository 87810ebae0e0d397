//! Tenant-scoped execution
//!
//! Row-level security policies read the caller from the transaction-local
//! `request.jwt.claims` setting. [`TenantContext::run_as`] sets it at the
//! start of a transaction, runs the unit of work on that transaction and
//! clears it again before committing or rolling back.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;
use metadetect_core::constants::{AUTHENTICATED_ROLE, CLAIMS_SETTING};
use metadetect_core::{AppError, CallerIdentity};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Future returned by a unit of work passed to [`TenantContext::run_as`].
pub type TenantFuture<'c, R> = Pin<Box<dyn Future<Output = Result<R, AppError>> + Send + 'c>>;

/// The caller on whose behalf persistence calls run.
///
/// Passed explicitly to every store call; there is no ambient "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    caller_id: Uuid,
}

impl TenantScope {
    pub fn new(caller_id: Uuid) -> Self {
        Self { caller_id }
    }

    pub fn caller_id(&self) -> Uuid {
        self.caller_id
    }

    /// Claims document consulted by the row-level security policies.
    pub fn claims_json(&self) -> String {
        serde_json::json!({
            "sub": self.caller_id.to_string(),
            "role": AUTHENTICATED_ROLE,
        })
        .to_string()
    }
}

impl From<&CallerIdentity> for TenantScope {
    fn from(identity: &CallerIdentity) -> Self {
        Self::new(identity.user_id)
    }
}

/// Runs units of work under a caller's identity.
#[derive(Clone)]
pub struct TenantContext {
    pool: PgPool,
}

impl TenantContext {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute `work` in a transaction whose claims identify `scope`'s caller.
    ///
    /// Commits when `work` succeeds and rolls back otherwise. The claims are
    /// cleared once `work` has finished, whether it returned or panicked; a
    /// panic is re-raised after the rollback. A failure to clear is logged and
    /// never replaces the result of `work`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let count = tenants
    ///     .run_as(&scope, |conn| {
    ///         Box::pin(async move {
    ///             let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM images")
    ///                 .fetch_one(&mut *conn)
    ///                 .await?;
    ///             Ok(n)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    #[tracing::instrument(skip(self, work), fields(tenant.caller_id = %scope.caller_id()))]
    pub async fn run_as<F, R>(&self, scope: &TenantScope, work: F) -> Result<R, AppError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> TenantFuture<'c, R> + Send,
        R: Send,
    {
        let mut tx = self.pool.begin().await?;
        set_claims(&mut *tx, &scope.claims_json()).await?;

        let outcome = AssertUnwindSafe(work(&mut *tx)).catch_unwind().await;

        if let Err(e) = set_claims(&mut *tx, "").await {
            tracing::warn!(error = %e, "Failed to clear tenant claims");
        }

        match outcome {
            Ok(Ok(value)) => {
                tx.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(error = %e, "Failed to roll back tenant transaction");
                }
                Err(err)
            }
            Err(panic) => {
                tx.rollback().await.ok();
                std::panic::resume_unwind(panic)
            }
        }
    }
}

async fn set_claims(conn: &mut PgConnection, claims: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config($1, $2, true)")
        .bind(CLAIMS_SETTING)
        .bind(claims)
        .execute(conn)
        .await?;
    Ok(())
}
