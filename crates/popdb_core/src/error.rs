//! Error types for popdb core.

use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The kind of filter a query string was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    /// A segment filter (`findSegments`).
    Segment,
    /// A map filter (`findMapIds`).
    Map,
}

impl fmt::Display for FilterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment => f.write_str("Segment"),
            Self::Map => f.write_str("Map"),
        }
    }
}

/// Errors that can occur in popdb core operations.
///
/// The `Display` output of each variant is the message returned to callers
/// of the contract, so the literal messages below are part of the wire
/// contract.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The submitted bytes are not a segment document.
    #[error("Could not parse segment")]
    Parse,

    /// The segment failed structural or hash validation.
    #[error("{0}")]
    Validation(String),

    /// A non-genesis segment references a parent that is not stored.
    #[error("Parent segment doesn't exist")]
    ParentNotFound,

    /// No segment is stored under the requested link hash.
    #[error("Segment does not exist")]
    NotFound,

    /// The filter query string is malformed.
    #[error("{target} filter format incorrect")]
    FilterFormat {
        /// Which filter was being parsed.
        target: FilterTarget,
        /// What was wrong with it.
        reason: String,
    },

    /// The configured backend cannot express a filter predicate.
    #[error("filter field {field} is not supported by the {backend} backend")]
    UnsupportedFilter {
        /// The rejected filter field.
        field: &'static str,
        /// The backend that rejected it.
        backend: &'static str,
    },

    /// A contract invocation was called with the wrong arguments.
    #[error("{0}")]
    InvalidArgument(String),

    /// A stored key or index entry could not be decoded.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of the decoding failure.
        message: String,
    },

    /// A stored record is not in the expected format.
    #[error("corrupted record: {message}")]
    CorruptedRecord {
        /// Description of the problem.
        message: String,
    },

    /// Ledger state error.
    #[error("storage error: {0}")]
    Storage(#[from] popdb_storage::StorageError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a validation error carrying the validator's message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a segment filter format error.
    pub fn segment_filter(reason: impl Into<String>) -> Self {
        Self::FilterFormat {
            target: FilterTarget::Segment,
            reason: reason.into(),
        }
    }

    /// Creates a map filter format error.
    pub fn map_filter(reason: impl Into<String>) -> Self {
        Self::FilterFormat {
            target: FilterTarget::Map,
            reason: reason.into(),
        }
    }

    /// Creates an unsupported filter error.
    pub fn unsupported_filter(field: &'static str, backend: &'static str) -> Self {
        Self::UnsupportedFilter { field, backend }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a corrupted record error.
    pub fn corrupted_record(message: impl Into<String>) -> Self {
        Self::CorruptedRecord {
            message: message.into(),
        }
    }
}
