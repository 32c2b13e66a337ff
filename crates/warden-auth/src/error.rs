//! Infrastructure errors raised while validating credentials
//!
//! These are never a verdict on the credentials themselves: a directory
//! outage must not look like a wrong password.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Directory {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Account database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether repeating the request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Directory(_) | StoreError::Timeout { .. })
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Internal(format!("Validation task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(StoreError::Directory("refused".to_string()).is_retryable());
        assert!(StoreError::Timeout {
            operation: "bind",
            seconds: 10
        }
        .is_retryable());
        assert!(!StoreError::Database("corrupt".to_string()).is_retryable());
        assert!(!StoreError::Internal("panic".to_string()).is_retryable());
    }
}
