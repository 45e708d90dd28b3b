use std::path::Path;
use std::time::Duration;

use dwatch::DWatchConfig;
use dwatch::Op;
use dwatch::WatchStore;
use dwatch::WatchStream;
use tokio::time::timeout;
use tracing::debug;

/// Poll interval used by watches under test
pub const POLL_INTERVAL_MS: u64 = 20;

/// Upper bound for any single expected op to arrive
pub const OP_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config(dsn: &str, namespace: &str) -> DWatchConfig {
    let mut config = DWatchConfig::default();
    config.storage.dsn = dsn.to_string();
    config.storage.namespace = namespace.to_string();
    config.watch.poll_interval_ms = POLL_INTERVAL_MS;
    config
}

pub async fn open_mem_store(namespace: &str) -> WatchStore {
    let config = test_config("mem://", namespace).validate().expect("valid config");
    WatchStore::open(&config).await.expect("mem store should open")
}

pub async fn open_sled_store(
    dir: &Path,
    namespace: &str,
) -> WatchStore {
    let dsn = format!("sled://{}", dir.display());
    let config = test_config(&dsn, namespace).validate().expect("valid config");
    WatchStore::open(&config).await.expect("sled store should open")
}

/// Waits for the next op, failing the test after `OP_TIMEOUT`.
pub async fn next_op(stream: &mut WatchStream) -> Op {
    match timeout(OP_TIMEOUT, stream.recv()).await {
        Ok(Some(op)) => {
            debug!(%op, "received");
            op
        }
        Ok(None) => panic!("watch on {} ended unexpectedly", stream.key()),
        Err(_) => panic!("no op for {} within {:?}", stream.key(), OP_TIMEOUT),
    }
}

/// Asserts that no op arrives during `window`.
pub async fn assert_quiet(
    stream: &mut WatchStream,
    window: Duration,
) {
    if let Ok(Some(op)) = timeout(window, stream.recv()).await {
        panic!("unexpected op {op}");
    }
}

/// Waits until the watch on `key` has established its baseline, which
/// materializes an absent key at version 0.
pub async fn wait_for_baseline(
    store: &WatchStore,
    key: &str,
) {
    let deadline = tokio::time::Instant::now() + OP_TIMEOUT;
    while store.records().version(key).await.expect("version read").is_none() {
        assert!(tokio::time::Instant::now() < deadline, "watch never initialized {key}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
