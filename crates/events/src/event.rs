use core::any::{Any, TypeId};
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::dynamic::Metadata;

/// Type-erasure helpers every event gets for free.
///
/// Blanket-implemented for all `'static` types, so `Event` implementors never
/// write these by hand.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Rust type name of the concrete event (for logs and diagnostics).
    fn type_name(&self) -> &'static str;
}

impl<T> AsAny for T
where
    T: Any + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// A domain event as seen by the dispatcher.
///
/// Events are:
/// - **named** (`event_name` is never empty)
/// - **grouped** by stream (`stream_name` may be empty, meaning "ungrouped")
/// - **serializable** into a JSON payload for structural reshaping
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct ItemAdded { stream_name: String, sku: String }
///
/// impl Event for ItemAdded {
///     fn event_name(&self) -> &str { "ItemAdded" }
///     fn stream_name(&self) -> &str { &self.stream_name }
///     fn payload(&self) -> serde_json::Result<JsonValue> { serde_json::to_value(self) }
/// }
/// ```
pub trait Event: AsAny + core::fmt::Debug {
    /// Stable event name (e.g. `"ItemAdded"`).
    fn event_name(&self) -> &str;

    /// Stream this event was written to (e.g. `"Cart-123"`).
    fn stream_name(&self) -> &str;

    /// Serialize the event body for structural reshaping.
    fn payload(&self) -> serde_json::Result<JsonValue>;

    /// Extensible metadata carried alongside the payload, if any.
    fn metadata(&self) -> Option<&Metadata> {
        None
    }
}

/// Events travel on the bus as shared trait objects.
pub type SharedEvent = Arc<dyn Event>;

/// Runtime identity of the type that produced an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProducerType {
    id: TypeId,
    name: &'static str,
}

impl ProducerType {
    pub fn of(event: &dyn Event) -> Self {
        Self {
            id: event.as_any().type_id(),
            name: event.type_name(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventEnvelope;

    #[derive(Debug)]
    struct Ping;

    impl Event for Ping {
        fn event_name(&self) -> &str {
            "Ping"
        }

        fn stream_name(&self) -> &str {
            ""
        }

        fn payload(&self) -> serde_json::Result<JsonValue> {
            Ok(JsonValue::Null)
        }
    }

    #[test]
    fn producer_type_sees_through_the_trait_object() {
        let shared: SharedEvent = Arc::new(Ping);
        let producer = ProducerType::of(shared.as_ref());

        assert_eq!(producer.id(), TypeId::of::<Ping>());
        assert!(producer.name().ends_with("Ping"));
    }

    #[test]
    fn different_event_types_are_different_producers() {
        let envelope = EventEnvelope::new("Ping", "", JsonValue::Null).unwrap();

        assert_ne!(ProducerType::of(&Ping), ProducerType::of(&envelope));
    }
}
