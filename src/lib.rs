//! # dwatch
//!
//! Change notifications ("watch") for keys of a transactional key-value
//! table that has no native change feed.
//!
//! Every record carries a version that grows by one per committed write
//! under a row lock. A watch polls that version for its key and turns each
//! observed transition into an [`Op`]: `Update` with the latest value, or
//! `Delete` when the row disappeared.
//!
//! - [`WatchStore`] is the entry point: `get` / `set` / `delete` / `watch`
//! - [`RecordStore`] is the versioned record layer on a [`RecordBackend`]
//! - [`MemBackend`] and [`SledBackend`] are the bundled backends
//! - [`DWatchConfig`] loads layered configuration (defaults, file, env)

mod client;
mod config;
mod constants;
mod errors;
mod metrics;
mod storage;
mod utils;
mod watch;

pub use client::*;
pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use storage::*;
pub use watch::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
