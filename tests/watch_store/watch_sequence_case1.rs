//! # Case: a watch observes every terminal state
//!
//! ## Setup:
//! 1. start a watch on an absent key
//! 2. set "a", set "b", delete, waiting for each op before the next write
//!
//! ## Criterias:
//! 1. ops arrive as Update(a), Update(b), Delete
//! 2. the idle watch stays quiet afterwards

use std::time::Duration;

use dwatch::Op;
use dwatch::OpType;
use dwatch::Result;
use dwatch::WatchOptions;

use crate::common::assert_quiet;
use crate::common::next_op;
use crate::common::open_mem_store;
use crate::common::wait_for_baseline;
use crate::common::POLL_INTERVAL_MS;

#[tokio::test]
async fn test_watch_sequence_case1() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("sequence").await;
    let mut stream = store.watch("k")?;
    wait_for_baseline(&store, "k").await;

    store.set("k", "a").await?;
    assert_eq!(next_op(&mut stream).await, Op::update("k", "a"));

    store.set("k", "b").await?;
    assert_eq!(next_op(&mut stream).await, Op::update("k", "b"));

    store.delete("k").await?;
    assert_eq!(next_op(&mut stream).await, Op::delete("k"));

    assert_quiet(&mut stream, Duration::from_millis(POLL_INTERVAL_MS * 10)).await;
    store.close().await
}

/// Writes faster than the poll interval collapse into one update carrying
/// the last value before the delete.
#[tokio::test]
async fn test_watch_sequence_case1_coalesced() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("coalesced").await;
    let options = WatchOptions::default().with_poll_interval(Duration::from_millis(300));
    let mut stream = store.watch_with("k", options)?;
    wait_for_baseline(&store, "k").await;

    for v in ["a", "b", "c"] {
        store.set("k", v).await?;
    }
    assert_eq!(next_op(&mut stream).await, Op::update("k", "c"));

    store.delete("k").await?;
    let op = next_op(&mut stream).await;
    assert_eq!(op.op_type, OpType::Delete);
    assert_eq!(op.value, None);
    store.close().await
}

/// A watch started after set, set, delete baselines on the absent key
/// without reporting anything.
#[tokio::test]
async fn test_watch_sequence_case1_late_watcher() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("late").await;
    store.set("k", "v1").await?;
    store.set("k", "v2").await?;
    store.delete("k").await?;

    let mut stream = store.watch("k")?;
    assert_quiet(&mut stream, Duration::from_millis(POLL_INTERVAL_MS * 10)).await;

    store.set("k", "v3").await?;
    assert_eq!(next_op(&mut stream).await, Op::update("k", "v3"));
    store.close().await
}

/// Two watches on one key receive the same ops independently.
#[tokio::test]
async fn test_watch_sequence_case1_two_watchers() -> Result<()> {
    crate::enable_logger();
    let store = open_mem_store("fanout").await;
    // existing row, so neither watch has to materialize the key
    store.set("k", "init").await?;
    let mut first = store.watch("k")?;
    let mut second = store.watch("k")?;
    // let both loops finish their baseline
    tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS * 3)).await;
    assert_eq!(store.active_watches(), 2);

    store.set("k", "x").await?;
    assert_eq!(next_op(&mut first).await, Op::update("k", "x"));
    assert_eq!(next_op(&mut second).await, Op::update("k", "x"));

    drop(first);
    store.delete("k").await?;
    assert_eq!(next_op(&mut second).await, Op::delete("k"));
    store.close().await
}
