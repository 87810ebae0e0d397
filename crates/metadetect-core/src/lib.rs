//! MetaDetect Core Library
//!
//! This crate provides core domain models, error types, configuration, and the
//! small runtime seams (clock, caller identity) that are shared across all
//! MetaDetect components.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BaseConfig, Config, MetaDetectConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use identity::{CallerIdentity, IdentityProvider, StaticIdentity};
pub use storage_types::StorageBackend;
