use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use sled::Batch;
use sled::Tree;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::storage::row_lock::RowLockTable;
use crate::storage::staged_transaction::StagedTransaction;
use crate::storage::staged_transaction::TableEngine;
use crate::BackendTransaction;
use crate::Error;
use crate::Query;
use crate::QueryOutput;
use crate::RecordBackend;
use crate::Result;
use crate::StorageError;
use crate::StoredRecord;

/// One sled tree per table; rows are bincode-encoded `StoredRecord`s.
#[derive(Debug)]
pub(crate) struct SledTables {
    db: sled::Db,
    trees: DashMap<String, Tree>,
}

impl SledTables {
    fn tree(
        &self,
        table: &str,
    ) -> Result<Tree> {
        if let Some(tree) = self.trees.get(table) {
            return Ok(tree.clone());
        }

        // Tables created by an earlier process are picked up lazily.
        let exists = self.db.tree_names().iter().any(|name| &name[..] == table.as_bytes());
        if !exists {
            return Err(StorageError::TableNotFound(table.to_string()).into());
        }
        let tree = self.db.open_tree(table)?;
        self.trees.insert(table.to_string(), tree.clone());
        Ok(tree)
    }

    fn create(
        &self,
        table: &str,
    ) -> Result<()> {
        let tree = self.db.open_tree(table)?;
        self.trees.insert(table.to_string(), tree);
        Ok(())
    }
}

impl TableEngine for SledTables {
    fn read(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<StoredRecord>> {
        match self.tree(table)?.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn apply(
        &self,
        table: &str,
        writes: Vec<(String, Option<StoredRecord>)>,
    ) -> Result<()> {
        let tree = self.tree(table)?;
        let mut batch = Batch::default();
        for (key, write) in writes {
            match write {
                Some(record) => batch.insert(key.as_bytes(), bincode::serialize(&record)?),
                None => batch.remove(key.as_bytes()),
            }
        }
        tree.apply_batch(batch)?;
        Ok(())
    }
}

/// Durable backend on an embedded sled database
#[derive(Debug)]
pub struct SledBackend {
    tables: Arc<SledTables>,
    locks: Arc<RowLockTable>,
}

impl SledBackend {
    pub fn open(
        path: impl AsRef<Path> + std::fmt::Debug,
        lock_wait_timeout: Duration,
    ) -> Result<Self> {
        debug!("open sled backend at: {:?}", &path);

        let db = sled::Config::default()
            .path(path.as_ref())
            .cache_capacity(64 * 1024 * 1024) //64MB
            .flush_every_ms(Some(10))
            .use_compression(true)
            .compression_factor(1)
            .open()
            .map_err(|e| {
                warn!("Try to open DB at this location: {:?} and failed: {:?}", path, e);
                Error::from(e)
            })?;

        Ok(Self::from_db(db, lock_wait_timeout))
    }

    pub fn from_db(
        db: sled::Db,
        lock_wait_timeout: Duration,
    ) -> Self {
        Self {
            tables: Arc::new(SledTables {
                db,
                trees: DashMap::new(),
            }),
            locks: Arc::new(RowLockTable::new(lock_wait_timeout)),
        }
    }
}

#[async_trait]
impl RecordBackend for SledBackend {
    async fn ensure_table(
        &self,
        table: &str,
    ) -> Result<()> {
        debug!(%table, "ensure table");
        self.tables.create(table)
    }

    async fn begin(
        &self,
        table: &str,
    ) -> Result<Box<dyn BackendTransaction>> {
        self.tables.tree(table)?;
        Ok(Box::new(StagedTransaction::new(
            self.tables.clone(),
            self.locks.clone(),
            table.to_string(),
        )))
    }

    #[instrument(skip(self))]
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
        let bytes = self.tables.db.flush_async().await?;
        info!(bytes, "sled backend flushed and closed");
        Ok(())
    }
}
