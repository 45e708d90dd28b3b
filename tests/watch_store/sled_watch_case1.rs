//! # Case: watching a durable key across a restart
//!
//! ## Setup:
//! 1. write a key into a sled store, then close it
//! 2. reopen and watch the same key
//!
//! ## Criterias:
//! 1. the watch baselines on the stored version without replaying it
//! 2. later writes are reported

use std::time::Duration;

use dwatch::Op;
use dwatch::Result;

use crate::common::assert_quiet;
use crate::common::next_op;
use crate::common::open_sled_store;
use crate::common::POLL_INTERVAL_MS;

#[tokio::test]
async fn test_sled_watch_case1() -> Result<()> {
    crate::enable_logger();
    let dir = tempfile::tempdir()?;
    {
        let store = open_sled_store(dir.path(), "durable").await;
        store.set("k", "before").await?;
        store.set("k", "restart").await?;
        store.close().await?;
    }

    let store = open_sled_store(dir.path(), "durable").await;
    let mut stream = store.watch("k")?;
    assert_quiet(&mut stream, Duration::from_millis(POLL_INTERVAL_MS * 10)).await;

    store.set("k", "after").await?;
    assert_eq!(next_op(&mut stream).await, Op::update("k", "after"));

    store.delete("k").await?;
    assert_eq!(next_op(&mut stream).await, Op::delete("k"));

    drop(stream);
    store.close().await
}
