//! Caller-facing error taxonomy.

use thiserror::Error;

/// Errors surfaced to the caller of any protected operation.
///
/// Every variant is recoverable: the session stays usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No actor is bound to the session.
    #[error("not authenticated")]
    NotAuthenticated,
    /// The authorization engine returned deny.
    #[error("permission denied: {action} {kind}")]
    PermissionDenied { action: String, kind: String },
    /// The record store write failed; nothing was persisted or broadcast.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ActionError {
    /// Stable, categorized reason string for user-visible rejections.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable() {
        assert_eq!(ActionError::NotAuthenticated.reason(), "not_authenticated");
        let denied = ActionError::PermissionDenied {
            action: "create".to_string(),
            kind: "notice".to_string(),
        };
        assert_eq!(denied.reason(), "permission_denied");
        assert_eq!(denied.to_string(), "permission denied: create notice");
        assert_eq!(
            ActionError::PersistenceFailure("disk".to_string()).reason(),
            "persistence_failure"
        );
    }
}
