//! # Case: concurrent writers on one key
//!
//! ## Setup:
//! 1. spawn N writers that each set the same key M times
//! 2. spawn writers on other keys at the same time
//!
//! ## Criterias:
//! 1. the final version is exactly N * M above the starting version
//! 2. writers on other keys are unaffected

use std::time::Duration;

use dwatch::Result;

use crate::common::open_mem_store;
use crate::common::open_sled_store;

const WRITERS: u64 = 8;
const SETS_PER_WRITER: u64 = 25;

async fn run_contention(store: dwatch::WatchStore) -> Result<()> {
    store.set("hot", "start").await?;
    let before = store.records().max_version("hot").await?;

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..SETS_PER_WRITER {
                store.set("hot", &format!("{writer}-{i}")).await?;
                store.set(&format!("cold-{writer}"), &i.to_string()).await?;
            }
            Ok::<(), dwatch::Error>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(
        store.records().max_version("hot").await?,
        before + WRITERS * SETS_PER_WRITER
    );
    for writer in 0..WRITERS {
        assert_eq!(
            store.records().max_version(&format!("cold-{writer}")).await?,
            SETS_PER_WRITER - 1
        );
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_case1_mem() -> Result<()> {
    crate::enable_logger();
    run_contention(open_mem_store("contention").await).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_case1_sled() -> Result<()> {
    crate::enable_logger();
    let dir = tempfile::tempdir()?;
    let result = tokio::time::timeout(
        Duration::from_secs(60),
        run_contention(open_sled_store(dir.path(), "contention").await),
    )
    .await;
    assert!(result.is_ok(), "contention run timed out");
    result.unwrap_or(Ok(()))
}
