//! Caller identity seam
//!
//! Identity extraction (JWT validation, claim parsing) happens outside the
//! core. The core only needs the caller's stable id and the raw bearer token
//! to forward to object storage, both treated as opaque.

use uuid::Uuid;

/// The authenticated caller of the current request.
#[derive(Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub bearer: String,
}

impl CallerIdentity {
    pub fn new(user_id: Uuid, bearer: impl Into<String>) -> Self {
        Self {
            user_id,
            bearer: bearer.into(),
        }
    }
}

// Keep bearer tokens out of logs.
impl std::fmt::Debug for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerIdentity")
            .field("user_id", &self.user_id)
            .field("bearer", &"<redacted>")
            .finish()
    }
}

/// Resolves the caller of the current request.
///
/// Implementations are request-scoped: one provider per request, never a
/// process-wide "current user".
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` when the request is unauthenticated.
    fn current_caller(&self) -> Option<CallerIdentity>;
}

/// Identity fixed at construction time (CLI invocations, tests).
#[derive(Debug, Clone)]
pub struct StaticIdentity(Option<CallerIdentity>);

impl StaticIdentity {
    pub fn new(identity: CallerIdentity) -> Self {
        Self(Some(identity))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_caller(&self) -> Option<CallerIdentity> {
        self.0.clone()
    }
}
