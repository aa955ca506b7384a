//! Server error types.

use std::net::SocketAddr;

use dbwarden_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Store error outside of per-rule application.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Maximum connections reached.
    #[error("maximum connections reached: {0}")]
    MaxConnectionsReached(usize),

    /// Request could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request exceeded the configured size limit.
    #[error("request too large: {size} bytes (limit {limit})")]
    RequestTooLarge { size: usize, limit: usize },

    /// Bind failed.
    #[error("failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl ServerError {
    /// HTTP status code that best describes this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::Store(e) if e.is_not_found() => 404,
            Self::Store(e) if e.is_timeout() => 503,
            Self::BadRequest(_) => 400,
            Self::RequestTooLarge { .. } => 413,
            Self::MaxConnectionsReached(_) => 503,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use dbwarden_types::{ResourceName, SubjectId};
    use test_case::test_case;

    use super::*;

    #[test_case(ServerError::MaxConnectionsReached(8), 503; "connection limit")]
    #[test_case(ServerError::BadRequest("x".into()), 400; "bad request")]
    #[test_case(ServerError::RequestTooLarge { size: 10, limit: 5 }, 413; "too large")]
    #[test_case(ServerError::Store(StoreError::Backend("x".into())), 500; "backend")]
    fn test_status_mapping(error: ServerError, status: u16) {
        assert_eq!(error.status(), status);
    }

    #[test]
    fn test_store_timeout_maps_to_503() {
        let error = ServerError::Store(StoreError::Timeout(std::time::Duration::from_secs(1)));
        assert_eq!(error.status(), 503);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let error = ServerError::Store(StoreError::NotFound {
            subject: SubjectId::new("u1"),
            resource: ResourceName::new("accounts"),
        });
        assert_eq!(error.status(), 404);
    }
}
