//! RecordBackend
//!
//! The transactional substrate the record store runs on. A backend owns a set
//! of tables (one per namespace), each holding `(key, value, version)` rows,
//! and offers:
//! - per-transaction commit/rollback
//! - row-level locks (lock one key without blocking others)
//! - an upsert whose version increment is computed against the stored row
//! - lock-free snapshot reads

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::constants::MEM_DSN_SCHEME;
use crate::constants::SLED_DSN_SCHEME;
use crate::constants::TABLE_NAME_PREFIX;
use crate::MemBackend;
use crate::Result;
use crate::SledBackend;
use crate::StorageConfig;
use crate::StorageError;

/// One row of a namespace table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub value: String,
    pub version: u64,
}

/// Write-path statements executed inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `SELECT k FROM t WHERE k = ? FOR UPDATE`; affects 0 or 1 row
    LockRow { key: String },
    /// `DELETE FROM t WHERE k = ?`; affects 0 or 1 row
    Delete { key: String },
    /// `INSERT ... VALUES (?, ?, 0) ON DUPLICATE KEY UPDATE v = VALUES(v), version = version + 1`
    UpsertIncrement { key: String, value: String },
}

impl Statement {
    pub fn key(&self) -> &str {
        match self {
            Statement::LockRow { key } | Statement::Delete { key } => key,
            Statement::UpsertIncrement { key, .. } => key,
        }
    }
}

/// Snapshot reads executed outside any transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Value of the row for `key`
    Value { key: String },
    /// `SELECT MAX(version) FROM t WHERE k = ?`
    MaxVersion { key: String },
}

impl Query {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Query::Value { .. } => "value",
            Query::MaxVersion { .. } => "max_version",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    Value(Option<String>),
    /// `None` when the key has no row
    Version(Option<u64>),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackendTransaction: Send {
    /// Executes one statement, returning the number of rows affected.
    ///
    /// Write statements take the row lock of their key when the transaction
    /// does not hold it yet. Effects stay invisible to other readers until
    /// `commit`.
    async fn execute(
        &mut self,
        statement: Statement,
    ) -> Result<u64>;

    /// Atomically applies every staged write and releases all row locks.
    async fn commit(&mut self) -> Result<()>;

    /// Discards every staged write and releases all row locks.
    async fn rollback(&mut self) -> Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordBackend: Send + Sync + 'static {
    /// Creates `table` when it does not exist yet.
    async fn ensure_table(
        &self,
        table: &str,
    ) -> Result<()>;

    async fn begin(
        &self,
        table: &str,
    ) -> Result<Box<dyn BackendTransaction>>;

    async fn query(
        &self,
        table: &str,
        query: Query,
    ) -> Result<QueryOutput>;

    async fn close(&self) -> Result<()>;
}

/// Maps a namespace to its table name.
pub fn table_name(namespace: &str) -> String {
    format!("{TABLE_NAME_PREFIX}{namespace}")
}

/// Namespaces end up inside table names, so only `[A-Za-z0-9_]` is allowed.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty()
        || !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StorageError::InvalidNamespace(namespace.to_string()).into());
    }
    Ok(())
}

/// Opens a backend from its connection string.
///
/// Supported forms:
/// - `mem://` in-process tables, lost on exit
/// - `sled://<path>` durable tables stored under `<path>`
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn RecordBackend>> {
    let dsn = config.dsn.as_str();
    debug!(%dsn, "open_backend");

    if dsn.starts_with(MEM_DSN_SCHEME) {
        return Ok(Arc::new(MemBackend::new(config.lock_wait_timeout())));
    }

    if let Some(path) = dsn.strip_prefix(SLED_DSN_SCHEME) {
        if path.is_empty() {
            return Err(StorageError::InvalidDsn(dsn.to_string()).into());
        }
        let backend = SledBackend::open(path, config.lock_wait_timeout())?;
        return Ok(Arc::new(backend));
    }

    Err(StorageError::InvalidDsn(dsn.to_string()).into())
}
