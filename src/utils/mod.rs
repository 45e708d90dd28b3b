mod async_task;
mod scoped_timer;

pub(crate) use async_task::*;
pub(crate) use scoped_timer::*;
