//! MetaDetect CLI: runs provenance analyses against the configured database
//! and object storage.

pub mod commands;
pub mod report;
pub mod telemetry;
pub mod wiring;

pub use telemetry::init_tracing;

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
