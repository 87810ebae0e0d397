//! Provenance analysis pipeline

mod download;
mod orchestrator;
mod outcome;

pub use download::{temp_file_suffix, ArtifactDownloader, DownloadError};
pub use orchestrator::AnalysisOrchestrator;
pub use outcome::{error_details, ExtractionError, ExtractionOutcome};
