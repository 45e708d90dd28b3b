//! Per-key polling state machine.
//!
//! Every iteration compares the remote version of the key with the last
//! version delivered to the subscriber:
//! - remote absent while local > 0: the key was deleted, emit `Delete`
//! - remote > local: emit `Update` with the current value
//! - otherwise: idle for one poll interval
//!
//! On top of these rules, a remote version below the local one is taken as
//! a delete followed by a recreation: the loop emits `Delete` and resets the
//! tracker, so the next iteration reports the recreated value as `Update`.
//! Plain polling would stay silent until the new version overtook the old one.
//!
//! After an emitted op the loop polls again immediately, so bursts drain
//! without waiting. Store errors are logged and retried after one poll
//! interval without touching the tracker.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::EventSender;
use crate::constants::ABSENT_VERSION;
use crate::constants::INITIAL_VERSION;
use crate::constants::MATERIALIZED_VALUE;
use crate::metrics::ACTIVE_WATCHES_METRIC;
use crate::metrics::WATCH_EVENTS_METRIC;
use crate::metrics::WATCH_POLL_ERRORS_METRIC;
use crate::Error;
use crate::Op;
use crate::RecordStore;
use crate::Result;
use crate::VersionTracker;
use crate::WatchError;

/// What the loop does after one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Poll again right away
    Continue,
    /// Sleep one poll interval first
    Idle,
}

pub(crate) struct WatchLoop {
    key: String,
    store: RecordStore,
    tracker: VersionTracker,
    poll_interval: Duration,
    sender: EventSender,
    cancel: CancellationToken,
}

impl WatchLoop {
    pub(crate) fn new(
        key: String,
        store: RecordStore,
        poll_interval: Duration,
        sender: EventSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            key,
            store,
            tracker: VersionTracker::new(),
            poll_interval,
            sender,
            cancel,
        }
    }

    /// Polls until cancelled or until the subscriber drops its receiver.
    ///
    /// Returning drops the sender, which closes the subscriber's channel.
    pub(crate) async fn run(mut self) -> Result<()> {
        let cancel = self.cancel.clone();
        ACTIVE_WATCHES_METRIC.inc();
        info!(key = %self.key, poll_interval = ?self.poll_interval, "watch started");

        loop {
            if cancel.is_cancelled() {
                debug!(key = %self.key, "watch cancelled");
                break;
            }
            if self.sender.is_closed() {
                debug!(key = %self.key, "subscriber gone");
                break;
            }

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(key = %self.key, "watch cancelled during poll");
                    break;
                }
                result = self.tick() => match result {
                    Ok(step) => step,
                    Err(Error::Watch(WatchError::ChannelClosed(_))) => {
                        debug!(key = %self.key, "subscriber gone while sending");
                        break;
                    }
                    Err(e) => {
                        warn!(key = %self.key, ?e, "watch poll failed, retrying next tick");
                        Step::Idle
                    }
                }
            };

            if step == Step::Idle {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(key = %self.key, "watch cancelled while idle");
                        break;
                    }
                    _ = sleep(self.poll_interval) => {}
                }
            }
        }

        ACTIVE_WATCHES_METRIC.dec();
        info!(key = %self.key, "watch stopped");
        Ok(())
    }

    /// One comparison of local and remote version.
    pub(crate) async fn tick(&mut self) -> Result<Step> {
        let local = match self.tracker.get() {
            Some(version) => version,
            None => self.establish_baseline().await?,
        };

        let remote = self
            .store
            .max_version(&self.key)
            .await
            .inspect_err(|_| poll_error("max_version"))?;
        trace!(key = %self.key, local, remote, "compare versions");

        if remote == ABSENT_VERSION && local > ABSENT_VERSION {
            self.emit(Op::delete(&self.key)).await?;
            self.tracker.set(ABSENT_VERSION);
            return Ok(Step::Continue);
        }

        if remote > local {
            let value = self.store.get(&self.key).await.inspect_err(|_| poll_error("get"))?;
            match value {
                Some(value) => {
                    self.emit(Op::update(&self.key, value)).await?;
                    self.tracker.set(remote);
                }
                // Deleted between the two reads; the next comparison reports it.
                None => debug!(key = %self.key, remote, "value gone before it was read"),
            }
            return Ok(Step::Continue);
        }

        if remote < local {
            debug!(key = %self.key, local, remote, "version went backwards, key was recreated");
            self.emit(Op::delete(&self.key)).await?;
            self.tracker.set(ABSENT_VERSION);
            return Ok(Step::Continue);
        }

        Ok(Step::Idle)
    }

    /// First observation of the key. A key without a row is materialized
    /// with an empty value so the watch starts from version 0; a row that
    /// appears before the insert is left untouched.
    async fn establish_baseline(&mut self) -> Result<u64> {
        let version = match self.store.current_version(&self.key).await {
            Ok(version) => version,
            Err(e) if e.is_no_rows() => {
                debug!(key = %self.key, "key absent, materializing it");
                let inserted = self
                    .store
                    .materialize(&self.key, MATERIALIZED_VALUE)
                    .await
                    .inspect_err(|_| poll_error("materialize"))?;
                if inserted {
                    INITIAL_VERSION
                } else {
                    // A writer created the key after the first read; start from its version.
                    self.store
                        .max_version(&self.key)
                        .await
                        .inspect_err(|_| poll_error("baseline"))?
                }
            }
            Err(e) => {
                poll_error("baseline");
                return Err(e);
            }
        };

        debug!(key = %self.key, version, "baseline established");
        self.tracker.set(version);
        Ok(version)
    }

    async fn emit(
        &self,
        op: Op,
    ) -> Result<()> {
        let op_type = op.op_type;
        trace!(%op, "emit");
        self.sender
            .send(op)
            .await
            .map_err(|_| WatchError::ChannelClosed(self.key.clone()))?;
        WATCH_EVENTS_METRIC.with_label_values(&[op_type.as_str()]).inc();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn tracker(&self) -> VersionTracker {
        self.tracker
    }
}

fn poll_error(stage: &'static str) {
    WATCH_POLL_ERRORS_METRIC.with_label_values(&[stage]).inc();
}
