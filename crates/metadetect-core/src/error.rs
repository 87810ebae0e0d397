//! Error types module
//!
//! Request-level failures are unified under [`AppError`]. Failures that happen
//! while an analysis is running are not `AppError`s: they are persisted on the
//! analysis record instead of being returned to the caller.
//!
//! The `Database` variant carries the sqlx error only with the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Deepest source chain printed by [`AppError::detailed_message`].
const MAX_SOURCE_DEPTH: usize = 5;

const RETRY_LATER: Option<&str> = Some("Retry after a short delay");

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes: missing rows, ownership failures, bad input
    Debug,
    /// Conflicting writes
    Warn,
    /// Unexpected failures
    Error,
}

/// How an error is presented by whatever front end sits on the services
/// (the CLI today).
pub trait ErrorMetadata {
    /// HTTP status code equivalent
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "MISSING_STORAGE_PATH")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to the caller
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Missing storage path: {0}")]
    MissingStoragePath(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Presentation of one variant.
struct Profile {
    status: u16,
    code: &'static str,
    action: Option<&'static str>,
    level: LogLevel,
}

impl Profile {
    /// Server-side failures: retryable, details hidden.
    fn server(status: u16, code: &'static str) -> Self {
        Self {
            status,
            code,
            action: RETRY_LATER,
            level: LogLevel::Error,
        }
    }

    fn client(status: u16, code: &'static str, action: Option<&'static str>) -> Self {
        Self {
            status,
            code,
            action,
            level: LogLevel::Debug,
        }
    }

    fn is_server(&self) -> bool {
        self.status >= 500
    }
}

impl AppError {
    fn profile(&self) -> Profile {
        match self {
            AppError::Database(_) => Profile::server(500, "DATABASE_ERROR"),
            AppError::Storage(_) => Profile::server(502, "STORAGE_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                Profile::server(500, "INTERNAL_ERROR")
            }
            AppError::Unauthenticated(_) => Profile::client(
                401,
                "UNAUTHENTICATED",
                Some("Sign in and retry with a valid bearer token"),
            ),
            AppError::NotFound(_) => {
                Profile::client(404, "NOT_FOUND", Some("Verify the resource ID exists"))
            }
            AppError::Forbidden(_) => Profile::client(
                403,
                "FORBIDDEN",
                Some("Only the owner of an image can access it"),
            ),
            AppError::MissingStoragePath(_) => Profile::client(
                400,
                "MISSING_STORAGE_PATH",
                Some("Upload the image file before requesting an analysis"),
            ),
            AppError::InvalidInput(_) => Profile::client(
                400,
                "INVALID_INPUT",
                Some("Check request parameters and try again"),
            ),
            AppError::Conflict(_) => Profile {
                level: LogLevel::Warn,
                ..Profile::client(409, "CONFLICT", None)
            },
        }
    }

    /// Variant name, without payload.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::MissingStoragePath(_) => "MissingStoragePath",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Conflict(_) => "Conflict",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// The message followed by its source chain, one cause per line.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut causes = std::iter::successors(self.source(), |&err| err.source());
        for cause in causes.by_ref().take(MAX_SOURCE_DEPTH) {
            details.push_str("\n  Caused by: ");
            details.push_str(&cause.to_string());
        }
        if causes.next().is_some() {
            details.push_str("\n  ... (truncated)");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.profile().status
    }

    fn error_code(&self) -> &'static str {
        self.profile().code
    }

    fn is_recoverable(&self) -> bool {
        self.profile().is_server()
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.profile().action
    }

    fn is_sensitive(&self) -> bool {
        self.profile().is_server()
    }

    fn log_level(&self) -> LogLevel {
        self.profile().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::Unauthenticated(msg)
            | AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::MissingStoragePath(msg)
            | AppError::InvalidInput(msg)
            | AppError::Conflict(msg) => msg.clone(),
        }
    }
}
