//! Runtime plumbing: durable bus subscriptions for event bindings.
//!
//! The binding/adaptation mechanics live in `duckbind-events` and do no IO
//! and spawn no threads. This crate owns the worker threads that feed them.

pub mod bus_subscriber;
pub mod config;
pub mod workers;

pub use bus_subscriber::BusSubscriber;
pub use config::SubscriberConfig;
pub use workers::{DurableSubscriber, SubscribeError, SubscriptionHandle};
