//! Background workers.

pub mod durable_subscriber;

pub use durable_subscriber::{DurableSubscriber, SubscribeError, SubscriptionHandle};
