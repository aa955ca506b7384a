//! Store error types.

use std::time::Duration;

use dbwarden_types::{DateParseError, ResourceName, SubjectId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing access windows.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No window exists for the pair.
    #[error("no access window for subject '{subject}' on '{resource}'")]
    NotFound {
        subject: SubjectId,
        resource: ResourceName,
    },

    /// The row lock could not be acquired in time.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored date is not in `YYYY-MM-DD` form.
    #[error("corrupt date in store: {0}")]
    CorruptDate(#[from] DateParseError),

    /// The backend rejected the statement.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a `Timeout` error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(feature = "duckdb")]
impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
