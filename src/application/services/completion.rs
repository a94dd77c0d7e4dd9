//! Completion signalling for enqueued sends.
//!
//! Every enqueue returns a [`SendHandle`] that resolves exactly once with the
//! terminal outcome of its send. The send task can wait for the caller to
//! finish observing that outcome before it releases resources the outcome
//! refers to.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::application::dto::SendReport;
use crate::domain::{MessageId, SendError};

pub type SendOutcome = Result<SendReport, SendError>;

/// Outcome plus the acknowledgement the receiver drops once it is done
/// with it.
#[derive(Debug)]
struct Delivery {
    outcome: SendOutcome,
    ack: oneshot::Sender<()>,
}

/// Sending half, owned by the send task.
pub(crate) struct Completion {
    tx: oneshot::Sender<Delivery>,
}

impl Completion {
    /// Deliver the terminal outcome. Consuming `self` makes a second
    /// completion impossible.
    pub(crate) fn complete(self, outcome: SendOutcome) -> Acknowledged {
        let (ack, acked) = oneshot::channel();
        // The caller may have dropped its handle; the send still ran. The
        // rejected delivery drops `ack` with it, so the wait ends at once.
        let _ = self.tx.send(Delivery { outcome, ack });
        Acknowledged(acked)
    }
}

/// Resolves once the caller has observed the outcome: the handle was
/// awaited, its `on_complete` callback returned, or it was dropped.
pub(crate) struct Acknowledged(oneshot::Receiver<()>);

impl Acknowledged {
    pub(crate) async fn wait(self) {
        // Only ever closed, never sent on.
        let _ = self.0.await;
    }
}

/// Awaitable result of one enqueued send.
#[derive(Debug)]
pub struct SendHandle {
    message_id: MessageId,
    rx: oneshot::Receiver<Delivery>,
}

impl SendHandle {
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Run one of two callbacks once the send finishes. The send task is
    /// not acknowledged until the callback has returned.
    pub fn on_complete<S, F>(self, on_success: S, on_failure: F) -> JoinHandle<()>
    where
        S: FnOnce(SendReport) + Send + 'static,
        F: FnOnce(SendError) + Send + 'static,
    {
        tokio::spawn(async move {
            let Delivery { outcome, ack } = match self.rx.await {
                Ok(delivery) => delivery,
                Err(_) => return on_failure(ended_without_outcome()),
            };
            match outcome {
                Ok(report) => on_success(report),
                Err(error) => on_failure(error),
            }
            drop(ack);
        })
    }
}

impl Future for SendHandle {
    type Output = SendOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(delivery) => delivery.outcome,
            Err(_) => Err(ended_without_outcome()),
        })
    }
}

fn ended_without_outcome() -> SendError {
    SendError::internal("send task ended without reporting an outcome")
}

pub(crate) fn channel(message_id: MessageId) -> (Completion, SendHandle) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, SendHandle { message_id, rx })
}
