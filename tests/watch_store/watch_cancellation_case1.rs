//! # Case: watch lifecycle
//!
//! ## Criterias:
//! 1. cancelling a stream ends it and stops its loop
//! 2. dropping a stream stops its loop
//! 3. closing the store ends every stream and rejects further calls

use std::time::Duration;

use dwatch::Error;
use dwatch::Result;
use futures::StreamExt;

use crate::common::next_op;
use crate::common::open_mem_store;
use crate::common::wait_for_baseline;
use crate::common::OP_TIMEOUT;

async fn wait_for_active(
    store: &dwatch::WatchStore,
    expected: usize,
) {
    let deadline = tokio::time::Instant::now() + OP_TIMEOUT;
    while store.active_watches() != expected {
        assert!(tokio::time::Instant::now() < deadline, "active watches never reached {expected}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_watch_cancellation_case1_cancel() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("cancel").await;
    let mut stream = store.watch("k")?;
    wait_for_baseline(&store, "k").await;

    store.set("k", "a").await?;
    assert_eq!(next_op(&mut stream).await.value.as_deref(), Some("a"));

    stream.cancel();
    assert_eq!(stream.next().await, None);
    wait_for_active(&store, 0).await;
    store.close().await
}

#[tokio::test]
async fn test_watch_cancellation_case1_drop() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("drop").await;
    let streams: Vec<_> = (0..4).map(|i| store.watch(&format!("k{i}"))).collect::<Result<_>>()?;
    assert_eq!(store.active_watches(), 4);

    drop(streams);
    wait_for_active(&store, 0).await;
    store.close().await
}

#[tokio::test]
async fn test_watch_cancellation_case1_store_close() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("close").await;
    let mut a = store.watch("a")?;
    let mut b = store.watch("b")?;

    store.close().await?;
    assert_eq!(a.recv().await, None);
    assert_eq!(b.recv().await, None);
    assert_eq!(store.active_watches(), 0);

    assert!(matches!(store.set("a", "v").await, Err(Error::Closed)));
    assert!(matches!(store.watch("a"), Err(Error::Closed)));
    Ok(())
}
