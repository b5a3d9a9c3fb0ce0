//! # Store Errors

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected or failed a statement.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A previous holder of the connection lock panicked.
    #[error("Connection lock poisoned")]
    Poisoned,

    /// The blocking task running the statement did not complete.
    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// An integer does not fit SQLite's signed 64-bit column type.
    #[error("Value {value} for {field} exceeds the storable range")]
    OutOfRange { field: &'static str, value: u64 },
}
