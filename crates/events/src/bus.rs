//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes events to every interested subscriber. It makes
//! minimal assumptions:
//!
//! - **Transport-agnostic**: in-memory channels, brokers, etc.
//! - **Broadcast**: each subscription receives its own copy of every event.
//! - **No ordering guarantees** beyond what an implementation provides.
//! - **No filtering**: subscribers filter the live stream themselves (see
//!   `EventFilter`), so one bus serves bindings with different interests.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A live subscription to a bus.
///
/// ## Usage Pattern
///
/// ```ignore
/// let subscription = bus.subscribe();
///
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(event) if filter.matches(event.as_ref()) => binding.dispatch(event.as_ref())?,
///         Ok(_) => continue,
///         Err(RecvTimeoutError::Timeout) => continue, // check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break, // bus closed
///     }
/// }
/// ```
///
/// A subscription is consumed by one thread at a time; share it behind a
/// mutex to fan events out to several workers.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Pub/sub event bus.
///
/// Used twice by the dispatcher: once for `SharedEvent`s, and once as the
/// out-of-band channel for `EventHandlingError` reports.
///
/// The trait requires `Send + Sync`: multiple threads may publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
