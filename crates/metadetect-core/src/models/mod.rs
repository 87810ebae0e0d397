//! Data models for the application
//!
//! Each sub-module represents a specific feature area.

mod analysis;
mod image;
mod responses;

pub use analysis::*;
pub use image::*;
pub use responses::*;
