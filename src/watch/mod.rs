//! Watch engine: per-subscription version tracking, the polling loop and
//! the event stream handed to subscribers.

mod channel;
mod op;
mod options;
mod subscription;
mod tracker;
mod watch_loop;

pub(crate) use channel::*;
pub use op::*;
pub use options::*;
pub use subscription::*;
pub use tracker::*;
pub(crate) use watch_loop::*;
