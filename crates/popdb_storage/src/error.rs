//! Error types for ledger state operations.

use std::io;
use thiserror::Error;

/// Result type for ledger state operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing ledger state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The state log is corrupted.
    #[error("state corrupted: {0}")]
    Corrupted(String),

    /// The backend cannot evaluate rich queries.
    #[error("rich queries are not supported by this state backend")]
    UnsupportedQuery,

    /// A rich query could not be parsed.
    #[error("invalid rich query: {0}")]
    InvalidQuery(String),

    /// The cursor was used after being closed or exhausted.
    #[error("iterator is closed")]
    IteratorClosed,
}

impl StorageError {
    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
