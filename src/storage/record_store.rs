//! Versioned Record Store
//!
//! One table per namespace holding `(key, value, version)`. Writes run in a
//! transaction that first takes the key's row lock, so concurrent writers of
//! the same key are serialized and every committed `set` bumps the version by
//! exactly one. Reads are lock-free snapshot reads.

use std::sync::Arc;

use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::constants::ABSENT_VERSION;
use crate::utils::ScopedTimer;
use crate::BackendTransaction;
use crate::Query;
use crate::QueryOutput;
use crate::RecordBackend;
use crate::Result;
use crate::Statement;
use crate::StorageError;

#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    namespace: Arc<str>,
    table: Arc<str>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RecordStore").field("table", &self.table).finish()
    }
}

impl RecordStore {
    pub fn new(
        backend: Arc<dyn RecordBackend>,
        namespace: &str,
    ) -> Result<Self> {
        super::validate_namespace(namespace)?;
        Ok(Self {
            backend,
            namespace: Arc::from(namespace),
            table: Arc::from(super::table_name(namespace)),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn backend(&self) -> &Arc<dyn RecordBackend> {
        &self.backend
    }

    /// Creates the namespace table when missing.
    pub async fn init(&self) -> Result<()> {
        self.backend.ensure_table(&self.table).await
    }

    /// Current value of `key`, `None` when the key has no row.
    ///
    /// Plain snapshot read: a concurrent `set`/`delete` may or may not be
    /// visible yet.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        let _timer = ScopedTimer::new("get");
        let query = Query::Value { key: key.to_string() };
        let name = query.name();
        match self.backend.query(&self.table, query).await? {
            QueryOutput::Value(value) => Ok(value),
            _ => Err(StorageError::UnexpectedOutput { query: name }.into()),
        }
    }

    /// Upserts `key`: version 0 on creation, previous version + 1 otherwise.
    #[instrument(skip(self, value))]
    pub async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let _timer = ScopedTimer::new("set");
        let txn = self.backend.begin(&self.table).await?;
        self.run_in_transaction(
            txn,
            vec![
                Statement::LockRow { key: key.to_string() },
                Statement::UpsertIncrement {
                    key: key.to_string(),
                    value: value.to_string(),
                },
            ],
        )
        .await?;
        debug!(%key, "set committed");
        Ok(())
    }

    /// Removes `key`; deleting an absent key succeeds without effect.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        let _timer = ScopedTimer::new("delete");
        let txn = self.backend.begin(&self.table).await?;
        let rows = self
            .run_in_transaction(
                txn,
                vec![
                    Statement::LockRow { key: key.to_string() },
                    Statement::Delete { key: key.to_string() },
                ],
            )
            .await?;
        debug!(%key, rows, "delete committed");
        Ok(())
    }

    /// Inserts `key` with `value` at the initial version unless a row exists.
    ///
    /// Existence is checked under the row lock, so a concurrent `set` is never
    /// overwritten. Returns whether the row was inserted.
    #[instrument(skip(self, value))]
    pub async fn materialize(
        &self,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let _timer = ScopedTimer::new("materialize");
        let mut txn = self.backend.begin(&self.table).await?;
        let present = match txn.execute(Statement::LockRow { key: key.to_string() }).await {
            Ok(rows) => rows > 0,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(?rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };
        if present {
            txn.commit().await?;
            debug!(%key, "row already present, materialize skipped");
            return Ok(false);
        }

        self.run_in_transaction(
            txn,
            vec![Statement::UpsertIncrement {
                key: key.to_string(),
                value: value.to_string(),
            }],
        )
        .await?;
        debug!(%key, "row materialized");
        Ok(true)
    }

    /// Stored version of `key`, or `None` without a row.
    pub async fn version(
        &self,
        key: &str,
    ) -> Result<Option<u64>> {
        let _timer = ScopedTimer::new("max_version");
        let query = Query::MaxVersion { key: key.to_string() };
        let name = query.name();
        match self.backend.query(&self.table, query).await? {
            QueryOutput::Version(version) => Ok(version),
            _ => Err(StorageError::UnexpectedOutput { query: name }.into()),
        }
    }

    /// Stored version of `key`; 0 when absent, indistinguishable from a
    /// freshly created key.
    pub async fn max_version(
        &self,
        key: &str,
    ) -> Result<u64> {
        Ok(self.version(key).await?.unwrap_or(ABSENT_VERSION))
    }

    /// Stored version of `key`, reporting absence as `StorageError::NoRows`.
    pub async fn current_version(
        &self,
        key: &str,
    ) -> Result<u64> {
        self.version(key).await?.ok_or_else(|| {
            StorageError::NoRows {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Executes `statements` in order and commits, returning the rows affected
    /// by the last one. Any failure rolls the whole transaction back.
    async fn run_in_transaction(
        &self,
        mut txn: Box<dyn BackendTransaction>,
        statements: Vec<Statement>,
    ) -> Result<u64> {
        let mut rows = 0;
        for statement in statements {
            match txn.execute(statement).await {
                Ok(n) => rows = n,
                Err(e) => {
                    warn!(table = %self.table, ?e, "statement failed, rolling back");
                    if let Err(rollback_err) = txn.rollback().await {
                        warn!(?rollback_err, "rollback failed");
                    }
                    return Err(e);
                }
            }
        }
        txn.commit().await?;
        Ok(rows)
    }
}
