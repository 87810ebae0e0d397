//! Test helpers: in-memory stores, a local object store and scripted
//! collaborators wired into the services.
//!
//! Run from workspace root: `cargo test -p metadetect-services`.
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fakes;
pub mod fixtures;

pub use fakes::{FixedUrlStore, RecordingAnalysisStore, ScriptedExtractor};
pub use fixtures::TestContext;
