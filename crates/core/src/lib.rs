//! `duckbind-core` — naming primitives shared by the event crates.
//!
//! This crate contains **pure** primitives (no threads, no IO): canonical
//! stream naming and the domain error model.

pub mod aggregate;
pub mod error;
pub mod stream;

pub use aggregate::{AggregateType, event_stream_name, instance_stream_name};
pub use error::{DomainError, DomainResult};
pub use stream::{STREAM_SEPARATOR, stream_category};
