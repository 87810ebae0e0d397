use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use metadetect_core::models::Image;
use metadetect_core::{CallerIdentity, FixedClock, StaticIdentity};
use metadetect_db::{AnalysisStore, ImageStore, InMemoryAnalysisStore, InMemoryImageStore};
use metadetect_services::{AnalysisOrchestrator, ArtifactDownloader, ExternalExtractor, ImageService};
use metadetect_storage::{LocalObjectStore, ObjectStore};
use tempfile::TempDir;
use uuid::Uuid;

use super::fakes::RecordingAnalysisStore;

pub const MAX_DOWNLOAD_BYTES: u64 = 1024 * 1024;

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// In-memory stores, a local object store and a scratch dir for downloads.
pub struct TestContext {
    pub user_id: Uuid,
    pub images: InMemoryImageStore,
    pub analyses: InMemoryAnalysisStore,
    pub recording: Arc<RecordingAnalysisStore>,
    pub storage: Arc<LocalObjectStore>,
    pub storage_dir: TempDir,
    pub work_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_images(InMemoryImageStore::new()).await
    }

    /// Image lookups ignore ownership, like a role that bypasses row security.
    pub async fn without_row_security() -> Self {
        Self::with_images(InMemoryImageStore::without_row_security()).await
    }

    async fn with_images(images: InMemoryImageStore) -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalObjectStore::new(storage_dir.path()).await.unwrap());
        let analyses = InMemoryAnalysisStore::new(images.clone());
        let recording = RecordingAnalysisStore::new(analyses.clone());
        Self {
            user_id: Uuid::new_v4(),
            images,
            analyses,
            recording,
            storage,
            storage_dir,
            work_dir,
        }
    }

    pub fn caller(&self) -> CallerIdentity {
        CallerIdentity::new(self.user_id, "test-bearer")
    }

    /// Write an object straight into the local store.
    pub fn put_object(&self, path: &str, bytes: &[u8]) {
        let full = self.storage.base_path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, bytes).unwrap();
    }

    pub fn seed_image(&self, owner_id: Uuid, filename: &str, storage_path: Option<&str>) -> Image {
        let image = Image {
            id: Uuid::new_v4(),
            owner_id,
            filename: filename.to_string(),
            storage_path: storage_path.map(str::to_string),
            labels: Vec::new(),
            note: None,
            uploaded_at: fixed_time(),
        };
        self.images.seed(image.clone());
        image
    }

    pub fn downloader(&self) -> ArtifactDownloader {
        ArtifactDownloader::new(Duration::from_secs(5), MAX_DOWNLOAD_BYTES)
            .unwrap()
            .with_temp_dir(self.work_dir.path())
    }

    pub fn work_dir_entries(&self) -> usize {
        std::fs::read_dir(self.work_dir.path()).unwrap().count()
    }

    pub fn orchestrator(&self, extractor: Arc<dyn ExternalExtractor>) -> AnalysisOrchestrator {
        self.orchestrator_with(
            Some(self.caller()),
            self.storage.clone(),
            self.recording.clone(),
            extractor,
        )
    }

    pub fn orchestrator_with(
        &self,
        caller: Option<CallerIdentity>,
        storage: Arc<dyn ObjectStore>,
        analyses: Arc<dyn AnalysisStore>,
        extractor: Arc<dyn ExternalExtractor>,
    ) -> AnalysisOrchestrator {
        let identity = match caller {
            Some(caller) => StaticIdentity::new(caller),
            None => StaticIdentity::anonymous(),
        };
        let images: Arc<dyn ImageStore> = Arc::new(self.images.clone());
        AnalysisOrchestrator::new(
            Arc::new(identity),
            images,
            analyses,
            storage,
            extractor,
            self.downloader(),
            Arc::new(FixedClock(fixed_time())),
        )
    }

    pub fn image_service(&self, caller: Option<CallerIdentity>) -> ImageService {
        let identity = match caller {
            Some(caller) => StaticIdentity::new(caller),
            None => StaticIdentity::anonymous(),
        };
        ImageService::new(
            Arc::new(identity),
            Arc::new(self.images.clone()),
            self.storage.clone(),
            Arc::new(FixedClock(fixed_time())),
        )
    }
}
