//! Event conduit between one watch loop and its subscriber.

use std::task::Context;
use std::task::Poll;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::Op;

/// Unbounded for `capacity == 0`, otherwise bounded with backpressure on the loop.
pub(crate) fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    if capacity > 0 {
        let (tx, rx) = mpsc::channel(capacity);
        (EventSender::Bounded(tx), EventReceiver::Bounded(rx))
    } else {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender::Unbounded(tx), EventReceiver::Unbounded(rx))
    }
}

#[derive(Debug)]
pub(crate) enum EventSender {
    Unbounded(mpsc::UnboundedSender<Op>),
    Bounded(mpsc::Sender<Op>),
}

impl EventSender {
    /// Waits for capacity on a bounded channel. Fails once the receiver is gone.
    pub(crate) async fn send(
        &self,
        op: Op,
    ) -> std::result::Result<(), Op> {
        match self {
            EventSender::Unbounded(tx) => tx.send(op).map_err(|e| e.0),
            EventSender::Bounded(tx) => tx.send(op).await.map_err(|e| e.0),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self {
            EventSender::Unbounded(tx) => tx.is_closed(),
            EventSender::Bounded(tx) => tx.is_closed(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum EventReceiver {
    Unbounded(mpsc::UnboundedReceiver<Op>),
    Bounded(mpsc::Receiver<Op>),
}

impl EventReceiver {
    pub(crate) async fn recv(&mut self) -> Option<Op> {
        match self {
            EventReceiver::Unbounded(rx) => rx.recv().await,
            EventReceiver::Bounded(rx) => rx.recv().await,
        }
    }

    pub(crate) fn try_recv(&mut self) -> std::result::Result<Op, TryRecvError> {
        match self {
            EventReceiver::Unbounded(rx) => rx.try_recv(),
            EventReceiver::Bounded(rx) => rx.try_recv(),
        }
    }

    pub(crate) fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Op>> {
        match self {
            EventReceiver::Unbounded(rx) => rx.poll_recv(cx),
            EventReceiver::Bounded(rx) => rx.poll_recv(cx),
        }
    }
}
