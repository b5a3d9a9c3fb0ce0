//! # Query Errors
//!
//! The three ways a report query can be rejected. Every variant aborts the
//! request; the core never retries and never returns a partial page.

use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Malformed or inconsistent input, detected before any store access.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Well-formed request for something that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store could not execute the count or the page select.
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl QueryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
