use std::pin::Pin;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use futures::Stream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::DropGuard;
use tracing::debug;

use super::event_channel;
use super::EventReceiver;
use super::WatchLoop;
use crate::utils::spawn_task;
use crate::Op;
use crate::RecordStore;
use crate::Result;
use crate::WatchError;
use crate::WatchOptions;

/// Spawns the watch loop of `key` and hands back its stream.
///
/// `active` counts running loops; it is incremented before the spawn and
/// decremented when the loop returns.
pub(crate) fn spawn_watch(
    store: RecordStore,
    key: &str,
    options: WatchOptions,
    cancel: CancellationToken,
    active: Arc<AtomicUsize>,
) -> WatchStream {
    let (sender, receiver) = event_channel(options.channel_capacity);
    let watch_loop = WatchLoop::new(
        key.to_string(),
        store,
        options.poll_interval,
        sender,
        cancel.clone(),
    );

    active.fetch_add(1, Ordering::SeqCst);
    let handle = spawn_task(format!("watch:{key}"), async move {
        let result = watch_loop.run().await;
        active.fetch_sub(1, Ordering::SeqCst);
        result
    });

    WatchStream::new(key.to_string(), receiver, cancel, handle)
}

/// Subscriber side of one watch.
///
/// Yields ops in the order the watch loop detected them. The stream ends
/// (`recv` returns `None`) once the loop stops: after `cancel`, after the
/// owning store is closed, or when the loop task exits on its own.
/// Dropping the stream cancels its loop.
#[derive(Debug)]
pub struct WatchStream {
    key: String,
    receiver: EventReceiver,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    _guard: DropGuard,
}

impl WatchStream {
    pub(crate) fn new(
        key: String,
        receiver: EventReceiver,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            key,
            receiver,
            cancel,
            handle: Some(handle),
            _guard: guard,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Waits for the next op; `None` once the watch has ended and every
    /// buffered op was received.
    pub async fn recv(&mut self) -> Option<Op> {
        self.receiver.recv().await
    }

    /// Returns a buffered op without waiting.
    ///
    /// `Ok(None)` when nothing is buffered yet, `WatchError::ChannelClosed`
    /// when the watch has ended and the buffer is drained.
    pub fn try_recv(&mut self) -> Result<Option<Op>> {
        match self.receiver.try_recv() {
            Ok(op) => Ok(Some(op)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WatchError::ChannelClosed(self.key.clone()).into()),
        }
    }

    /// Asks the watch loop to stop. Ops already buffered stay receivable.
    pub fn cancel(&self) {
        debug!(key = %self.key, "cancel watch");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the watch and waits for its loop to finish.
    pub async fn close(mut self) -> Result<()> {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }
}

impl Stream for WatchStream {
    type Item = Op;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
