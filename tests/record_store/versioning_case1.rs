//! # Case: versioned CRUD on a durable backend
//!
//! ## Setup:
//! 1. open a sled-backed store in a temp dir
//! 2. set, set, delete, set the same key
//! 3. close and reopen the store from the same path
//!
//! ## Criterias:
//! 1. versions count committed sets from 0
//! 2. delete resets the version space
//! 3. values and versions survive a reopen

use std::sync::Arc;
use std::time::Duration;

use dwatch::MemBackend;
use dwatch::RecordBackend;
use dwatch::Result;
use dwatch::WatchConfig;
use dwatch::WatchStore;

use crate::common::open_sled_store;

#[tokio::test]
async fn test_versioning_case1() -> Result<()> {
    crate::enable_logger();
    let dir = tempfile::tempdir()?;

    {
        let store = open_sled_store(dir.path(), "versioning").await;
        let records = store.records();

        store.set("k", "v1").await?;
        assert_eq!(store.get("k").await?, Some("v1".to_string()));
        assert_eq!(records.max_version("k").await?, 0);

        store.set("k", "v2").await?;
        assert_eq!(records.max_version("k").await?, 1);

        store.delete("k").await?;
        assert_eq!(store.get("k").await?, None);
        assert_eq!(records.max_version("k").await?, 0);
        assert!(records.current_version("k").await.unwrap_err().is_no_rows());

        store.set("k", "v3").await?;
        assert_eq!(records.version("k").await?, Some(0));
        store.set("k", "v4").await?;
        store.close().await?;
    }

    let store = open_sled_store(dir.path(), "versioning").await;
    assert_eq!(store.get("k").await?, Some("v4".to_string()));
    assert_eq!(store.records().max_version("k").await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_namespaces_share_backend_not_keys() -> Result<()> {
    let backend: Arc<dyn RecordBackend> = Arc::new(MemBackend::new(Duration::from_secs(1)));
    let orders = WatchStore::new(backend.clone(), "orders", &WatchConfig::default())?;
    let users = WatchStore::new(backend, "users", &WatchConfig::default())?;
    orders.init().await?;
    users.init().await?;

    orders.set("k", "order").await?;
    assert_eq!(users.get("k").await?, None);

    users.set("k", "user").await?;
    users.set("k", "user2").await?;
    assert_eq!(orders.records().max_version("k").await?, 0);
    assert_eq!(users.records().max_version("k").await?, 1);
    Ok(())
}
