//! Watch Store Error Hierarchy
//!
//! Defines the error types surfaced by the record store, the watch engine and
//! the configuration layer.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend, transaction and encoding failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Subscription lifecycle failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration values rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The store has been closed; no further operations are accepted
    #[error("Watch store is closed")]
    Closed,

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The queried key has no row in the namespace table
    #[error("No rows for key: {key}")]
    NoRows { key: String },

    /// Another transaction held the row lock for longer than the wait timeout
    #[error("Lock wait timeout on key {key} after {timeout:?}")]
    LockWaitTimeout { key: String, timeout: Duration },

    /// Statement issued against a committed or rolled back transaction
    #[error("Transaction already finished")]
    TransactionFinished,

    /// Table was never created through `ensure_table`
    #[error("Table does not exist: {0}")]
    TableNotFound(String),

    /// Connection string could not be parsed
    #[error("Invalid dsn: {0}")]
    InvalidDsn(String),

    /// Namespace is empty or contains characters not allowed in a table name
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Backend query returned an output that does not match the query kind
    #[error("Unexpected query output for {query}")]
    UnexpectedOutput { query: &'static str },

    /// Serialization failures for persisted records
    #[error(transparent)]
    Codec(#[from] bincode::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Disk I/O failures while opening the backend
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Subscriber dropped its receiving half
    #[error("Event channel closed for key {0}")]
    ChannelClosed(String),

    /// Subscription was cancelled before the operation finished
    #[error("Watch on key {0} cancelled")]
    Cancelled(String),

    /// Background watch task panicked or was aborted
    #[error("Watch task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

impl Error {
    /// True when the error only reports a missing row.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::Storage(StorageError::NoRows { .. }))
    }
}

// ============== Conversion Implementations ============== //
impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        WatchError::TaskFailed(err).into()
    }
}
