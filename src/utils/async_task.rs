use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;

use crate::Result;

/// Spawns a named background task, logging its error instead of propagating it.
pub(crate) fn spawn_task<Fut>(
    name: impl Into<String>,
    task: Fut,
) -> JoinHandle<()>
where
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move {
        match task.await {
            Ok(()) => debug!("spawned task: {name} finished"),
            Err(e) => error!("spawned task: {name} stopped or encountered an error: {:?}", e),
        }
    })
}
