use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::open_backend;
use crate::watch::spawn_watch;
use crate::DWatchConfig;
use crate::Error;
use crate::RecordBackend;
use crate::RecordStore;
use crate::Result;
use crate::WatchConfig;
use crate::WatchOptions;
use crate::WatchStream;

/// Versioned key-value namespace with change subscriptions
///
/// Cheap to clone; clones share the backend, the watch defaults and the
/// shutdown signal. Every `watch` spawns one polling task that lives until
/// its stream is cancelled or dropped, or until the store is closed.
#[derive(Clone)]
pub struct WatchStore {
    inner: Arc<WatchStoreInner>,
}

struct WatchStoreInner {
    store: RecordStore,
    defaults: WatchOptions,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl std::fmt::Debug for WatchStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchStore")
            .field("namespace", &self.namespace())
            .field("active_watches", &self.active_watches())
            .finish()
    }
}

impl WatchStore {
    /// Wraps an already opened backend. Call [`WatchStore::init`] before use
    /// unless the namespace table is known to exist.
    pub fn new(
        backend: Arc<dyn RecordBackend>,
        namespace: &str,
        watch_config: &WatchConfig,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(WatchStoreInner {
                store: RecordStore::new(backend, namespace)?,
                defaults: WatchOptions::from(watch_config),
                shutdown: CancellationToken::new(),
                active: Arc::new(AtomicUsize::new(0)),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Opens the configured backend and creates the namespace table.
    pub async fn open(config: &DWatchConfig) -> Result<Self> {
        let backend = open_backend(&config.storage)?;
        let store = Self::new(backend, &config.storage.namespace, &config.watch)?;
        store.init().await?;
        info!(
            dsn = %config.storage.dsn,
            namespace = %config.storage.namespace,
            "watch store opened"
        );
        Ok(store)
    }

    /// Creates the namespace table when missing.
    pub async fn init(&self) -> Result<()> {
        self.ensure_open()?;
        self.inner.store.init().await
    }

    pub fn namespace(&self) -> &str {
        self.inner.store.namespace()
    }

    /// Versioned record store behind this handle
    pub fn records(&self) -> &RecordStore {
        &self.inner.store
    }

    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        self.ensure_open()?;
        self.inner.store.get(key).await
    }

    pub async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.ensure_open()?;
        self.inner.store.set(key, value).await
    }

    pub async fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        self.ensure_open()?;
        self.inner.store.delete(key).await
    }

    /// Subscribes to changes of `key` with the store's watch defaults.
    pub fn watch(
        &self,
        key: &str,
    ) -> Result<WatchStream> {
        self.watch_with(key, self.inner.defaults)
    }

    /// Subscribes to changes of `key` with per-watch options.
    pub fn watch_with(
        &self,
        key: &str,
        options: WatchOptions,
    ) -> Result<WatchStream> {
        self.ensure_open()?;
        if options.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("watch poll interval must be greater than 0".into()));
        }

        debug!(%key, ?options, "watch");
        Ok(spawn_watch(
            self.inner.store.clone(),
            key,
            options,
            self.inner.shutdown.child_token(),
            self.inner.active.clone(),
        ))
    }

    /// Number of watch loops still running
    pub fn active_watches(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Cancels every subscription and closes the backend.
    ///
    /// Streams still deliver ops buffered before the close, then end. Later
    /// calls on any clone of this store return [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        info!(namespace = %self.namespace(), active = self.active_watches(), "closing watch store");
        self.inner.shutdown.cancel();
        self.inner.store.backend().close().await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
