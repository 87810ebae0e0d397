//! Builds the services from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metadetect_core::{CallerIdentity, Clock, Config, IdentityProvider, StaticIdentity, SystemClock};
use metadetect_db::{AnalysisRepository, AnalysisStore, ImageRepository, ImageStore, MIGRATOR};
use metadetect_services::{
    AnalysisOrchestrator, ArtifactDownloader, C2paToolInvoker, ExternalExtractor, ImageService,
};
use metadetect_storage::create_object_store;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub struct App {
    pub orchestrator: AnalysisOrchestrator,
    pub images: ImageService,
}

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    tracing::debug!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .connect(config.database_url())
        .await
        .context("Failed to connect to database")?;

    tracing::debug!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::debug!("Database migrations applied");

    Ok(pool)
}

/// Wire repositories, storage and the extractor for one caller.
pub async fn build_app(config: &Config, caller: Option<CallerIdentity>) -> Result<App> {
    let pool = setup_database(config).await?;

    let identity: Arc<dyn IdentityProvider> = Arc::new(match caller {
        Some(caller) => StaticIdentity::new(caller),
        None => StaticIdentity::anonymous(),
    });
    let images: Arc<dyn ImageStore> = Arc::new(ImageRepository::new(pool.clone()));
    let analyses: Arc<dyn AnalysisStore> = Arc::new(AnalysisRepository::new(pool));
    let storage = create_object_store(config)
        .await
        .context("Failed to initialize object storage")?;
    let extractor: Arc<dyn ExternalExtractor> = Arc::new(C2paToolInvoker::from_config(config));
    let downloader =
        ArtifactDownloader::from_config(config).context("Failed to build HTTP client")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    tracing::debug!(
        storage_backend = %config.storage_backend(),
        c2pa_tool = %config.c2pa_tool_path(),
        "Services initialized"
    );

    Ok(App {
        orchestrator: AnalysisOrchestrator::new(
            identity.clone(),
            images.clone(),
            analyses,
            storage.clone(),
            extractor,
            downloader,
            clock.clone(),
        ),
        images: ImageService::new(identity, images, storage, clock),
    })
}
