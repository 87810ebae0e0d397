//! Database repositories for data access layer
//!
//! Every repository call runs inside its own tenant-scoped transaction, so a
//! write is committed (and visible to other connections) by the time the call
//! returns.
//
// Tenant scoping (RunAs)
pub mod tenant;
//
// Store seams shared by the Postgres and in-memory implementations
pub mod stores;
//
// Postgres repositories
pub mod analysis;
pub mod image;
//
// In-memory repositories
pub mod memory;

pub use analysis::AnalysisRepository;
pub use image::ImageRepository;
pub use memory::{InMemoryAnalysisStore, InMemoryImageStore};
pub use stores::{AnalysisStore, ImageStore};
pub use tenant::{TenantContext, TenantScope};
