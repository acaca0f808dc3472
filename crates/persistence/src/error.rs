//! Storage error type.

use thiserror::Error;

/// Errors raised by audit storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Audit store is not ready")]
    NotReady,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotReady => "not_ready",
            StoreError::Database(_) => "database",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_display() {
        let err = StoreError::Unavailable("connection refused".into());
        assert_eq!(err.kind(), "unavailable");
        assert_eq!(err.to_string(), "Audit store unavailable: connection refused");

        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "database");

        assert_eq!(StoreError::NotReady.kind(), "not_ready");
        assert_eq!(StoreError::NotReady.to_string(), "Audit store is not ready");
    }
}
