use std::time::Duration;

use crate::WatchConfig;

/// Per-subscription tuning; defaults come from the store's `WatchConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    /// `0` for an unbounded channel
    pub channel_capacity: usize,
}

impl WatchOptions {
    pub fn with_poll_interval(
        mut self,
        poll_interval: Duration,
    ) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_channel_capacity(
        mut self,
        channel_capacity: usize,
    ) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}

impl From<&WatchConfig> for WatchOptions {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            channel_capacity: config.channel_capacity,
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from(&WatchConfig::default())
    }
}
