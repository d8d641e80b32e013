//! Event bindings and duck-typed projection dispatch.
//!
//! A consumer registers a handler for a *shape* (its parameter type). The
//! binding derives an [`EventFilter`] from that shape, and every matching bus
//! event is [adapted](Adapter) into the shape before the handler runs:
//! natively when the producer's type is the handler's type, structurally
//! (through `serde_json`) otherwise.

pub mod adapter;
pub mod binding;
pub mod bus;
pub mod cache;
pub mod dynamic;
pub mod envelope;
pub mod error;
pub mod event;
pub mod filter;
pub mod in_memory_bus;
pub mod registry;
pub mod shape;

pub use adapter::{Adapted, Adapter};
pub use binding::{BindingBuilder, EventBinding, EventHandlerBinder, HandlerResult};
pub use bus::{EventBus, Subscription};
pub use cache::AdaptationCache;
pub use dynamic::{DynamicEvent, ExtensibleMetadata, Metadata};
pub use envelope::EventEnvelope;
pub use error::{
    AdaptationFailure, BackfillRefused, ConfigurationError, DispatchError, EventHandlingError,
    FailureKind,
};
pub use event::{AsAny, Event, ProducerType, SharedEvent};
pub use filter::{EventFilter, MatchEvent, WILDCARD};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use registry::HandlerRegistry;
pub use shape::{AdaptationPath, EventShape, GENERIC_SHAPE_NAMES, ShapeKind, TargetShape};
