//! Application-wide constants.

/// Maximum number of characters of a failure message stored in an analysis'
/// `details` payload.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 2000;

/// Postgres setting read by row-level security policies to identify the caller.
pub const CLAIMS_SETTING: &str = "request.jwt.claims";

/// Role claim placed next to the caller id in the tenant claims.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Temp file suffix used when the storage path carries no usable extension.
pub const FALLBACK_FILE_SUFFIX: &str = ".bin";

/// Longest extension (dot included) that is carried over to the temp file.
pub const MAX_FILE_SUFFIX_LEN: usize = 10;

/// Note returned by the compare placeholder.
pub const COMPARE_PLACEHOLDER_NOTE: &str = "Similarity analysis not yet implemented";
