//! Transition publishing/subscription abstraction (mechanics only).
//!
//! The bus is intentionally **lightweight** and makes minimal assumptions:
//!
//! - **Transport-agnostic**: works with in-memory channels, message queues,
//!   webhook fan-out, etc.
//! - **Best-effort delivery**: the engine publishes after commit and never
//!   rolls back business state on a publish failure, so observers get
//!   at-most-once (possibly-zero) delivery and must tolerate gaps.
//! - **No persistence**: the bus distributes notifications; the entity rows
//!   are the source of truth.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a stream of published messages.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transition event sink + subscription source (pub/sub abstraction).
///
/// The engine holds a `TransitionBus` and publishes each committed
/// [`crate::TransitionEvent`] to it. Publish failures are surfaced to the
/// publisher, which may log and continue; they must never affect the already
/// committed business transaction.
pub trait TransitionBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> TransitionBus<M> for Arc<B>
where
    B: TransitionBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
