use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metadetect_core::models::{AnalysisCompletion, AnalysisRecord};
use metadetect_core::AppError;
use metadetect_db::{AnalysisStore, InMemoryAnalysisStore, TenantScope};
use metadetect_services::ExtractorError;
use metadetect_services::ExternalExtractor;
use metadetect_storage::{ObjectStore, StorageBackend, StorageResult};
use uuid::Uuid;

/// What the scripted extractor does when called.
#[derive(Debug, Clone)]
pub enum Script {
    Manifest(String),
    Exit { code: i32, stderr: String },
    Panic(String),
}

/// One extractor invocation: the path it got and the bytes on disk at that moment.
#[derive(Debug, Clone)]
pub struct ExtractorCall {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

pub struct ScriptedExtractor {
    script: Script,
    calls: Mutex<Vec<ExtractorCall>>,
}

impl ScriptedExtractor {
    pub fn returning(manifest: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Manifest(manifest.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(code: i32, stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Exit {
                code,
                stderr: stderr.to_string(),
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn panicking(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Panic(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ExtractorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExternalExtractor for ScriptedExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let contents = std::fs::read(path).unwrap_or_default();
        self.calls.lock().unwrap().push(ExtractorCall {
            path: path.to_path_buf(),
            contents,
        });
        match &self.script {
            Script::Manifest(manifest) => Ok(manifest.clone()),
            Script::Exit { code, stderr } => Err(ExtractorError::Failed {
                code: Some(*code),
                excerpt: format!("stderr: {}", stderr),
            }),
            Script::Panic(message) => panic!("{}", message),
        }
    }
}

/// Signs every path to the same URL.
pub struct FixedUrlStore {
    url: String,
}

impl FixedUrlStore {
    pub fn new(url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { url: url.into() })
    }
}

#[async_trait]
impl ObjectStore for FixedUrlStore {
    async fn create_signed_url(&self, _path: &str, _bearer: &str) -> StorageResult<String> {
        Ok(self.url.clone())
    }

    async fn delete_object(&self, _path: &str, _bearer: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn upload_object(
        &self,
        _path: &str,
        _data: Vec<u8>,
        _content_type: &str,
        _bearer: &str,
    ) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Counts terminal writes and can be told to fail them.
pub struct RecordingAnalysisStore {
    inner: InMemoryAnalysisStore,
    completions: AtomicUsize,
    fail_completion: AtomicBool,
}

impl RecordingAnalysisStore {
    pub fn new(inner: InMemoryAnalysisStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            completions: AtomicUsize::new(0),
            fail_completion: AtomicBool::new(false),
        })
    }

    pub fn fail_completions(&self) {
        self.fail_completion.store(true, Ordering::SeqCst);
    }

    pub fn completion_count(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisStore for RecordingAnalysisStore {
    async fn insert(&self, scope: &TenantScope, record: &AnalysisRecord) -> Result<(), AppError> {
        self.inner.insert(scope, record).await
    }

    async fn find_by_id(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        self.inner.find_by_id(scope, id).await
    }

    async fn complete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        completion: &AnalysisCompletion,
    ) -> Result<(), AppError> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(AppError::Internal("database unavailable".to_string()));
        }
        self.inner.complete(scope, id, completion).await
    }

    async fn list_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Vec<AnalysisRecord>, AppError> {
        self.inner.list_by_image(scope, image_id).await
    }

    async fn latest_by_image(
        &self,
        scope: &TenantScope,
        image_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, AppError> {
        self.inner.latest_by_image(scope, image_id).await
    }
}
