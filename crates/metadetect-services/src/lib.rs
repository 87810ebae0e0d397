//! MetaDetect services
//!
//! Business logic on top of the persistence and storage layers: the
//! provenance analysis pipeline (`AnalysisOrchestrator`), the c2patool
//! integration and ownership-checked image management (`ImageService`).

pub mod access;
pub mod analysis;
pub mod c2pa;
pub mod images;

pub use access::require_owned_image;
pub use analysis::{
    AnalysisOrchestrator, ArtifactDownloader, DownloadError, ExtractionError, ExtractionOutcome,
};
pub use c2pa::{manifest_summary, C2paToolInvoker, ExternalExtractor, ExtractorError, ManifestError};
pub use images::ImageService;
