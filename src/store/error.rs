//! Storage error types
//!
//! Storage failures are opaque to the mapper: it never classifies or retries
//! them, it only carries them upward with the operation that failed attached.

use std::fmt;

use thiserror::Error;

/// Store operation being performed when the error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Filtered multi-document read.
    Find,
    /// Counting documents matching a filter.
    Count,
    /// Single-document read.
    FindOne,
    /// Inserting a document.
    Insert,
    /// Atomic find-and-update.
    FindOneAndUpdate,
    /// Atomic find-and-delete.
    FindOneAndDelete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::FindOne => write!(f, "find_one"),
            Self::Insert => write!(f, "insert"),
            Self::FindOneAndUpdate => write!(f, "find_one_and_update"),
            Self::FindOneAndDelete => write!(f, "find_one_and_delete"),
        }
    }
}

/// Opaque storage failure with operation context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error during {operation}: {message}")]
pub struct StorageError {
    /// The operation being performed when the error occurred.
    pub operation: StoreOperation,
    /// Backend-supplied message, surfaced unchanged.
    pub message: String,
}

impl StorageError {
    /// Create a storage error for the given operation.
    pub fn new(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(format!("{}", StoreOperation::Find), "find");
        assert_eq!(
            format!("{}", StoreOperation::FindOneAndUpdate),
            "find_one_and_update"
        );
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::new(StoreOperation::Insert, "connection reset");
        assert_eq!(
            err.to_string(),
            "storage error during insert: connection reset"
        );
    }
}
