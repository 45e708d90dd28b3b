//! Row-level locks shared by all transactions of one backend.
//!
//! Each `(table, key)` pair maps to its own async mutex, so transactions on
//! different keys never contend. Entries are created on first use, even for
//! keys without a row, and removed again once the last holder is gone.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

use crate::Result;
use crate::StorageError;

type RowId = (String, String);

#[derive(Debug)]
pub(crate) struct RowLockTable {
    locks: DashMap<RowId, Arc<Mutex<()>>>,
    wait_timeout: Duration,
}

impl RowLockTable {
    pub(crate) fn new(wait_timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            wait_timeout,
        }
    }

    /// Waits for the row lock of `key`, failing after the wait timeout.
    pub(crate) async fn acquire(
        self: &Arc<Self>,
        table: &str,
        key: &str,
    ) -> Result<RowLockGuard> {
        let row_id = (table.to_string(), key.to_string());
        let mutex = self.locks.entry(row_id.clone()).or_default().clone();

        match tokio::time::timeout(self.wait_timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                trace!(%table, %key, "row lock acquired");
                Ok(RowLockGuard {
                    row_id,
                    table: Arc::clone(self),
                    guard: Some(guard),
                })
            }
            Err(_) => {
                self.release_if_idle(&row_id);
                Err(StorageError::LockWaitTimeout {
                    key: key.to_string(),
                    timeout: self.wait_timeout,
                }
                .into())
            }
        }
    }

    /// Drops the map entry when only the map itself still references the mutex.
    fn release_if_idle(
        &self,
        row_id: &RowId,
    ) {
        self.locks.remove_if(row_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Holds one row lock until dropped
#[derive(Debug)]
pub(crate) struct RowLockGuard {
    row_id: RowId,
    table: Arc<RowLockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowLockGuard {
    fn drop(&mut self) {
        // Release the mutex first so the idle check below sees only the map's reference.
        self.guard.take();
        self.table.release_if_idle(&self.row_id);
        trace!(table = %self.row_id.0, key = %self.row_id.1, "row lock released");
    }
}
