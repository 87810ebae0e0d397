//! MetaDetect Storage Library
//!
//! This crate provides the object storage abstraction used by MetaDetect and
//! its implementations for Supabase Storage, S3 and the local filesystem.
//!
//! # Object path format
//!
//! Image objects live at `{owner_id}/{image_id}--{filename}`. Paths must not
//! be empty, contain `..` or start with `/`. Path generation and validation
//! live in the `keys` module so all backends stay consistent.
//!
//! Every operation takes the caller's bearer token. Backends that enforce
//! per-user access (Supabase) forward it; the others ignore it.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(feature = "storage-supabase")]
pub mod supabase;
pub mod traits;

// Re-export commonly used types
pub use factory::create_object_store;
pub use keys::image_object_path;
#[cfg(feature = "storage-local")]
pub use local::LocalObjectStore;
pub use metadetect_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3ObjectStore;
#[cfg(feature = "storage-supabase")]
pub use supabase::SupabaseObjectStore;
pub use traits::{ObjectStore, StorageError, StorageResult};
