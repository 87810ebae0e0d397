//! MetaDetect persistence layer
//!
//! Tenant-scoped execution (`TenantContext`), the `ImageStore` and
//! `AnalysisStore` seams, their Postgres repositories and in-memory
//! counterparts that apply the same row visibility rules.

pub mod db;

pub use db::{
    AnalysisRepository, AnalysisStore, ImageRepository, ImageStore, InMemoryAnalysisStore,
    InMemoryImageStore, TenantContext, TenantScope,
};

/// Embedded SQL migrations (`migrations/` at the workspace root).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
