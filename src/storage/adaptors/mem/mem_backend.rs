use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use tracing::info;

use crate::storage::row_lock::RowLockTable;
use crate::storage::staged_transaction::StagedTransaction;
use crate::storage::staged_transaction::TableEngine;
use crate::BackendTransaction;
use crate::Query;
use crate::QueryOutput;
use crate::RecordBackend;
use crate::Result;
use crate::StorageError;
use crate::StoredRecord;

type Table = HashMap<String, StoredRecord>;

/// Committed rows of every table, guarded by one lock
#[derive(Debug, Default)]
pub(crate) struct MemTables {
    tables: RwLock<HashMap<String, Table>>,
}

impl TableEngine for MemTables {
    fn read(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<StoredRecord>> {
        let tables = self.tables.read();
        let rows = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(rows.get(key).cloned())
    }

    fn apply(
        &self,
        table: &str,
        writes: Vec<(String, Option<StoredRecord>)>,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        for (key, write) in writes {
            match write {
                Some(record) => rows.insert(key, record),
                None => rows.remove(&key),
            };
        }
        Ok(())
    }
}

/// In-process backend; tables live as long as the backend instance.
#[derive(Debug)]
pub struct MemBackend {
    tables: Arc<MemTables>,
    locks: Arc<RowLockTable>,
}

impl MemBackend {
    pub fn new(lock_wait_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(MemTables::default()),
            locks: Arc::new(RowLockTable::new(lock_wait_timeout)),
        }
    }

    fn check_table(
        &self,
        table: &str,
    ) -> Result<()> {
        if !self.tables.tables.read().contains_key(table) {
            return Err(StorageError::TableNotFound(table.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for MemBackend {
    async fn ensure_table(
        &self,
        table: &str,
    ) -> Result<()> {
        let mut tables = self.tables.tables.write();
        if !tables.contains_key(table) {
            debug!(%table, "create table");
            tables.insert(table.to_string(), Table::new());
        }
        Ok(())
    }

    async fn begin(
        &self,
        table: &str,
    ) -> Result<Box<dyn BackendTransaction>> {
        self.check_table(table)?;
        Ok(Box::new(StagedTransaction::new(
            self.tables.clone(),
            self.locks.clone(),
            table.to_string(),
        )))
    }

    async fn query(
        &self,
        table: &str,
        query: Query,
    ) -> Result<QueryOutput> {
        let output = match query {
            Query::Value { key } => QueryOutput::Value(self.tables.read(table, &key)?.map(|r| r.value)),
            Query::MaxVersion { key } => {
                QueryOutput::Version(self.tables.read(table, &key)?.map(|r| r.version))
            }
        };
        Ok(output)
    }

    async fn close(&self) -> Result<()> {
        info!("mem backend closed");
        Ok(())
    }
}
