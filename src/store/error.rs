//! Store Errors
//!
//! Error types for document store operations.

/// Errors that can occur in the document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The call did not finish within the store timeout
    #[error("Store call timed out")]
    Timeout,

    /// The store refused the call
    #[error("Store unavailable")]
    Unavailable,

    /// Update target missing or tombstoned
    #[error("Document not found in {table}: {uid}")]
    NotFound { table: &'static str, uid: String },
}

impl StoreError {
    /// Check if the caller may retry the call
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout | StoreError::Unavailable | StoreError::Database(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(StoreError::Timeout.is_retryable());
        assert!(StoreError::Unavailable.is_retryable());
        assert!(!StoreError::NotFound {
            table: "scenes",
            uid: "x".into()
        }
        .is_retryable());
    }
}
