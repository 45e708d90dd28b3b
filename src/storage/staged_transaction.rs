//! Transaction shared by the embedded backends.
//!
//! Writes are staged in a per-transaction overlay and become visible to
//! readers only when `commit` hands the whole overlay to the table engine in
//! one atomic apply. Row locks are taken on first touch of a key and held
//! until commit, rollback or drop.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::row_lock::RowLockGuard;
use super::row_lock::RowLockTable;
use crate::constants::INITIAL_VERSION;
use crate::BackendTransaction;
use crate::Result;
use crate::Statement;
use crate::StorageError;
use crate::StoredRecord;

/// Committed-state access an embedded backend provides to its transactions
pub(crate) trait TableEngine: Send + Sync + 'static {
    fn read(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<StoredRecord>>;

    /// Applies all writes at once; `None` deletes the row.
    fn apply(
        &self,
        table: &str,
        writes: Vec<(String, Option<StoredRecord>)>,
    ) -> Result<()>;
}

pub(crate) struct StagedTransaction<E: TableEngine> {
    engine: Arc<E>,
    locks: Arc<RowLockTable>,
    table: String,
    held: HashMap<String, RowLockGuard>,
    staged: BTreeMap<String, Option<StoredRecord>>,
    finished: bool,
}

impl<E: TableEngine> StagedTransaction<E> {
    pub(crate) fn new(
        engine: Arc<E>,
        locks: Arc<RowLockTable>,
        table: String,
    ) -> Self {
        Self {
            engine,
            locks,
            table,
            held: HashMap::new(),
            staged: BTreeMap::new(),
            finished: false,
        }
    }

    async fn lock_row(
        &mut self,
        key: &str,
    ) -> Result<()> {
        if !self.held.contains_key(key) {
            let guard = self.locks.acquire(&self.table, key).await?;
            self.held.insert(key.to_string(), guard);
        }
        Ok(())
    }

    /// Row as seen by this transaction: own staged writes first.
    fn view(
        &self,
        key: &str,
    ) -> Result<Option<StoredRecord>> {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.engine.read(&self.table, key),
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.staged.clear();
        self.held.clear();
    }
}

#[async_trait]
impl<E: TableEngine> BackendTransaction for StagedTransaction<E> {
    async fn execute(
        &mut self,
        statement: Statement,
    ) -> Result<u64> {
        if self.finished {
            return Err(StorageError::TransactionFinished.into());
        }
        self.lock_row(statement.key()).await?;

        let rows = match statement {
            Statement::LockRow { key } => self.view(&key)?.map_or(0, |_| 1),
            Statement::Delete { key } => match self.view(&key)? {
                Some(_) => {
                    self.staged.insert(key, None);
                    1
                }
                None => 0,
            },
            Statement::UpsertIncrement { key, value } => {
                // 1 for an insert, 2 for an update of an existing row
                let (version, rows) = match self.view(&key)? {
                    Some(existing) => (existing.version + 1, 2),
                    None => (INITIAL_VERSION, 1),
                };
                trace!(table = %self.table, %key, version, "staged upsert");
                self.staged.insert(key, Some(StoredRecord { value, version }));
                rows
            }
        };
        Ok(rows)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Err(StorageError::TransactionFinished.into());
        }

        let writes: Vec<_> = std::mem::take(&mut self.staged).into_iter().collect();
        let count = writes.len();
        let result = if writes.is_empty() {
            Ok(())
        } else {
            self.engine.apply(&self.table, writes)
        };
        self.finish();

        match &result {
            Ok(_) => debug!(table = %self.table, count, "transaction committed"),
            Err(e) => warn!(table = %self.table, ?e, "transaction commit failed"),
        }
        result
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.finished {
            return Err(StorageError::TransactionFinished.into());
        }
        debug!(table = %self.table, staged = self.staged.len(), "transaction rolled back");
        self.finish();
        Ok(())
    }
}

impl<E: TableEngine> Drop for StagedTransaction<E> {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            debug!(table = %self.table, staged = self.staged.len(), "dropped open transaction, discarding writes");
        }
    }
}
