//! Turning a failed command into a message on stderr.

use metadetect_core::{AppError, ErrorMetadata, LogLevel};

/// One or two lines for the user: the client-safe message of an [`AppError`]
/// with its code and hint, or the full context chain of anything else.
pub fn error_summary(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app) => {
            let mut summary = format!("error [{}]: {}", app.error_code(), app.client_message());
            if let Some(action) = app.suggested_action() {
                summary.push_str("\nhint: ");
                summary.push_str(action);
            }
            summary
        }
        None => format!("error: {:#}", err),
    }
}

/// Log the failure at the level its error asks for.
pub fn log_error(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app) => {
            let details = app.detailed_message();
            match app.log_level() {
                LogLevel::Debug => tracing::debug!(error = %details, "Command failed"),
                LogLevel::Warn => tracing::warn!(error = %details, "Command failed"),
                LogLevel::Error => tracing::error!(error = %details, "Command failed"),
            }
        }
        None => tracing::error!(error = %format!("{:#}", err), "Command failed"),
    }
}
