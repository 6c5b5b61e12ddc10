//! Error types for dualstore
//!
//! This module defines all error types used throughout the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two conditions are deliberately absent: looking up a key that does not
//! exist yields `None`/an end cursor, and reading a link whose target was
//! deleted yields an empty optional. Neither is an error.

use std::io;
use thiserror::Error;

/// Result type alias for dualstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dualstore
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation requires a store-managed collection or object
    #[error("Not managed: {0}")]
    NotManaged(String),

    /// Collection or property was already migrated into a store
    #[error("Already managed: {0}")]
    AlreadyManaged(String),

    /// Mutation attempted outside a write transaction
    #[error("Cannot modify managed objects outside of a write transaction")]
    NotInWriteTransaction,

    /// `begin_write` called while a write transaction is open
    #[error("The store is already in a write transaction")]
    AlreadyInWriteTransaction,

    /// Accessor refers to a deleted object or an invalidated collection
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// No table with the given name or key
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// No column with the given name or key
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Stored value does not have the type the reader expected
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type the reader asked for
        expected: String,
        /// Type actually stored
        actual: String,
    },

    /// Positional access past the end of a collection
    #[error("Index {index} out of bounds (len {len})")]
    OutOfBounds {
        /// Requested index
        index: usize,
        /// Collection length at the time of access
        len: usize,
    },

    /// The store was closed or dropped
    #[error("Store is closed")]
    StoreClosed,

    /// Malformed input (parse failures, invalid arguments)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be parsed or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a `TypeMismatch` from anything string-like
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this error reports a violated usage precondition rather than
    /// a data or environment failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NotManaged(_)
                | Error::AlreadyManaged(_)
                | Error::NotInWriteTransaction
                | Error::AlreadyInWriteTransaction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
    }

    #[test]
    fn test_error_display_not_managed() {
        let err = Error::NotManaged("observe".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Not managed"));
        assert!(msg.contains("observe"));
    }

    #[test]
    fn test_error_display_type_mismatch() {
        let err = Error::type_mismatch("Int", "String");
        assert_eq!(err.to_string(), "Type mismatch: expected Int, got String");
    }

    #[test]
    fn test_error_display_out_of_bounds() {
        let err = Error::OutOfBounds { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Index 4 out of bounds (len 2)");
    }

    #[test]
    fn test_precondition_classification() {
        assert!(Error::NotManaged(String::new()).is_precondition());
        assert!(Error::AlreadyManaged(String::new()).is_precondition());
        assert!(Error::NotInWriteTransaction.is_precondition());
        assert!(!Error::StoreClosed.is_precondition());
        assert!(!Error::InvalidInput("x".into()).is_precondition());
    }

    #[test]
    fn test_io_error_conversion() {
        fn fails() -> Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Io(_))));
    }
}
