//! Public entry point of the watch store
//!
//! [`WatchStore`] bundles a namespace's [`crate::RecordStore`] with the watch
//! engine:
//! - `get` / `set` / `delete` for versioned records
//! - `watch` / `watch_with` for change streams of a single key
//!
//! # Basic Usage
//! ```no_run
//! use dwatch::{DWatchConfig, WatchStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = DWatchConfig::new().unwrap().validate().unwrap();
//!     let store = WatchStore::open(&config).await.unwrap();
//!
//!     let mut stream = store.watch("hello").unwrap();
//!     store.set("hello", "world").await.unwrap();
//!
//!     while let Some(op) = stream.recv().await {
//!         println!("{op}");
//!     }
//! }
//! ```

mod watch_store;

pub use watch_store::*;
