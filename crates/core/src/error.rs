//! Error types for the configuration model
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the configuration model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Path argument does not start with a leading `/`
    ///
    /// Returned before any tree access, so a malformed path can never
    /// cause a partial write.
    #[error("invalid path: {path}")]
    InvalidPath {
        /// The offending path argument
        path: String,
    },

    /// No node matches the requested path
    #[error("not found: {path}")]
    NotFound {
        /// Absolute path that failed to resolve
        path: String,
    },

    /// Add targeted a key that is already occupied
    #[error("key conflict at {path}: {key} already exists")]
    KeyConflict {
        /// Absolute path of the collection
        path: String,
        /// Key derived from the inserted record
        key: String,
    },

    /// A registered callback reported a failure during dispatch
    ///
    /// Isolated per callback; tree state is never affected by a
    /// failing observer.
    #[error("callback execution failed: {message}")]
    CallbackExecution {
        /// Failure description reported by the callback
        message: String,
    },

    /// Operation against a committed, cancelled, or unknown branch id
    #[error("transaction {txid} is {state}")]
    TransactionState {
        /// Branch id the caller supplied
        txid: String,
        /// Observed branch state ("committed", "cancelled", "unknown")
        state: String,
    },

    /// A second exclusive proxy was requested over an overlapping subtree
    #[error("exclusive proxy conflict at {path}")]
    ExclusiveConflict {
        /// Absolute path of the rejected proxy
        path: String,
    },

    /// Record data does not satisfy its schema descriptors
    #[error("schema error: {message}")]
    Schema {
        /// Description of the violated descriptor constraint
        message: String,
    },

    /// The operation's context was cancelled or its deadline passed
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid operation or state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Convenience constructor for [`Error::InvalidPath`]
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Error::InvalidPath { path: path.into() }
    }

    /// Convenience constructor for [`Error::NotFound`]
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Convenience constructor for [`Error::Schema`]
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema {
            message: message.into(),
        }
    }

    /// True if this error is a not-found navigation failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
