//! Submit / GetStatus / GetManifest / Compare

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use metadetect_core::models::{
    AnalysisManifestResponse, AnalysisRecord, AnalysisStatusResponse, AnalyzeCompareResponse,
    AnalyzeStartResponse,
};
use metadetect_core::{AppError, Clock, IdentityProvider};
use metadetect_db::{AnalysisStore, ImageStore, TenantScope};
use metadetect_storage::ObjectStore;
use uuid::Uuid;

use super::download::ArtifactDownloader;
use super::outcome::{ExtractionError, ExtractionOutcome};
use crate::access::{require_caller, require_owned_image};
use crate::c2pa::{ExternalExtractor, ExtractorError};

/// Runs provenance analyses for the caller's images.
///
/// Submit is synchronous: by the time it returns the analysis is DONE or
/// FAILED, unless persisting the terminal state itself failed.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    identity: Arc<dyn IdentityProvider>,
    images: Arc<dyn ImageStore>,
    analyses: Arc<dyn AnalysisStore>,
    storage: Arc<dyn ObjectStore>,
    extractor: Arc<dyn ExternalExtractor>,
    downloader: ArtifactDownloader,
    clock: Arc<dyn Clock>,
}

impl AnalysisOrchestrator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        images: Arc<dyn ImageStore>,
        analyses: Arc<dyn AnalysisStore>,
        storage: Arc<dyn ObjectStore>,
        extractor: Arc<dyn ExternalExtractor>,
        downloader: ArtifactDownloader,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            images,
            analyses,
            storage,
            extractor,
            downloader,
            clock,
        }
    }

    #[tracing::instrument(skip(self), fields(image_id = %image_id, analysis_id = tracing::field::Empty))]
    pub async fn submit(&self, image_id: Uuid) -> Result<AnalyzeStartResponse, AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        let scope = TenantScope::from(&caller);

        let image = require_owned_image(self.images.as_ref(), &scope, image_id).await?;
        let storage_path = image
            .usable_storage_path()
            .ok_or_else(|| {
                AppError::MissingStoragePath("Image has no stored file to analyze".to_string())
            })?
            .to_string();

        let record = AnalysisRecord::pending(image.id, self.clock.now());
        self.analyses.insert(&scope, &record).await?;
        tracing::Span::current().record("analysis_id", tracing::field::display(record.id));
        tracing::info!(storage_path = %storage_path, "Analysis created");

        let start = Instant::now();
        let attempt = AssertUnwindSafe(self.extract_manifest(&storage_path, &caller.bearer))
            .catch_unwind()
            .await;
        let outcome = match attempt {
            Ok(result) => ExtractionOutcome::from_result(result),
            Err(panic) => {
                let message = panic_message(&*panic);
                tracing::error!(panic = %message, "Extraction panicked");
                ExtractionOutcome::Failure(format!("extraction panicked: {}", message))
            }
        };
        let completion = outcome.into_completion();
        let status = completion.status;

        match self.analyses.complete(&scope, record.id, &completion).await {
            Ok(()) => tracing::info!(
                status = %status,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Analysis finished"
            ),
            Err(e) => tracing::error!(
                error = %e,
                status = %status,
                "Failed to persist analysis result; record stays PENDING"
            ),
        }

        Ok(AnalyzeStartResponse {
            analysis_id: record.id,
        })
    }

    /// Sign, download, extract. The temp file is removed on every path.
    async fn extract_manifest(
        &self,
        storage_path: &str,
        bearer: &str,
    ) -> Result<String, ExtractionError> {
        let url = self.storage.create_signed_url(storage_path, bearer).await?;
        let temp = self.downloader.download_to_temp(&url, storage_path).await?;

        let result = self.extractor.extract(temp.path()).await;

        let temp_path = temp.path().to_path_buf();
        if let Err(e) = temp.close() {
            tracing::debug!(error = %e, path = %temp_path.display(), "Failed to remove temp file");
        }

        match result {
            Ok(manifest) if manifest.trim().is_empty() => {
                tracing::warn!("Extractor returned no manifest");
                Err(ExtractorError::EmptyOutput.into())
            }
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed");
                Err(e.into())
            }
        }
    }

    #[tracing::instrument(skip(self), fields(analysis_id = %analysis_id))]
    pub async fn get_status(&self, analysis_id: Uuid) -> Result<AnalysisStatusResponse, AppError> {
        let record = self.owned_analysis(analysis_id).await?;
        Ok(AnalysisStatusResponse {
            analysis_id: record.id,
            status: record.status,
            score: record.confidence,
        })
    }

    /// The stored manifest, byte for byte. `NotFound` while the analysis has no details.
    #[tracing::instrument(skip(self), fields(analysis_id = %analysis_id))]
    pub async fn get_manifest(
        &self,
        analysis_id: Uuid,
    ) -> Result<AnalysisManifestResponse, AppError> {
        let record = self.owned_analysis(analysis_id).await?;
        let manifest_json = record
            .details
            .filter(|details| !details.is_empty())
            .ok_or_else(|| AppError::NotFound("Manifest not available".to_string()))?;
        Ok(AnalysisManifestResponse {
            analysis_id: record.id,
            manifest_json,
        })
    }

    /// Ownership-checks both images (left first) and returns a fixed placeholder.
    #[tracing::instrument(skip(self), fields(left = %left, right = %right))]
    pub async fn compare(&self, left: Uuid, right: Uuid) -> Result<AnalyzeCompareResponse, AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        let scope = TenantScope::from(&caller);
        require_owned_image(self.images.as_ref(), &scope, left).await?;
        require_owned_image(self.images.as_ref(), &scope, right).await?;
        Ok(AnalyzeCompareResponse::placeholder())
    }

    /// Every analysis of an owned image, newest first.
    #[tracing::instrument(skip(self), fields(image_id = %image_id))]
    pub async fn list_for_image(&self, image_id: Uuid) -> Result<Vec<AnalysisRecord>, AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        let scope = TenantScope::from(&caller);
        require_owned_image(self.images.as_ref(), &scope, image_id).await?;
        self.analyses.list_by_image(&scope, image_id).await
    }

    #[tracing::instrument(skip(self), fields(image_id = %image_id))]
    pub async fn latest_for_image(&self, image_id: Uuid) -> Result<AnalysisRecord, AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        let scope = TenantScope::from(&caller);
        require_owned_image(self.images.as_ref(), &scope, image_id).await?;
        self.analyses
            .latest_by_image(&scope, image_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No analysis for this image".to_string()))
    }

    async fn owned_analysis(&self, analysis_id: Uuid) -> Result<AnalysisRecord, AppError> {
        let caller = require_caller(self.identity.as_ref())?;
        let scope = TenantScope::from(&caller);
        let record = self
            .analyses
            .find_by_id(&scope, analysis_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;
        require_owned_image(self.images.as_ref(), &scope, record.image_id).await?;
        Ok(record)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
