//! C2PA provenance extraction

mod invoker;
mod manifest;

pub use invoker::{C2paToolInvoker, ExternalExtractor, ExtractorError};
pub use manifest::{manifest_summary, ManifestError};
