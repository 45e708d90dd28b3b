use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Store-wide watch defaults
///
/// Every subscription starts from these values; `WatchOptions` can
/// override them per watch.
///
/// ```toml
/// [watch]
/// poll_interval_ms = 1000
/// channel_capacity = 0
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Idle time between two version polls of the same key
    ///
    /// Bounds the notification latency of a watch. Polls after a detected
    /// change are issued immediately, so bursts are drained without waiting.
    ///
    /// **Default**: 1000
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capacity of each subscription's event channel
    ///
    /// `0` means unbounded. With a positive capacity a slow consumer stalls
    /// the polling of its own key until it drains the channel.
    ///
    /// **Default**: 0
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl WatchConfig {
    /// Validates watch configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "watch.poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.channel_capacity > 100_000 {
            warn!(
                "watch.channel_capacity ({}) is very large; consider 0 (unbounded) instead",
                self.channel_capacity
            );
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_channel_capacity() -> usize {
    0
}
