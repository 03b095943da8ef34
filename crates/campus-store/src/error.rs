//! Record store errors.

use campus_types::ActionError;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Maps a unique-constraint violation to `Conflict`, leaving other errors as-is.
    pub(crate) fn unique_violation(err: rusqlite::Error, what: impl Into<String>) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(what.into())
            }
            other => Self::Database(other),
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ActionError::NotFound(what),
            StoreError::Conflict(what) => ActionError::InvalidInput(what),
            other => ActionError::PersistenceFailure(other.to_string()),
        }
    }
}
