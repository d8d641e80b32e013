//! Adapting raw bus events into handler shapes.
//!
//! Two tiers:
//! 1. **Native identity**: the raw event already is the handler's type. It is
//!    handed over by reference, untouched.
//! 2. **Structural reshape**: the payload is serialized to JSON and rebuilt as
//!    the target shape, followed by a best-effort stream-name back-fill.
//!
//! Back-fill refusals are remembered per producer type in the
//! [`AdaptationCache`], so each producer type pays for a refused attempt once.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;

use crate::cache::AdaptationCache;
use crate::error::AdaptationFailure;
use crate::event::{Event, ProducerType};
use crate::shape::{AdaptationPath, EventShape, TargetShape};

/// Result of adapting one event.
#[derive(Debug)]
pub struct Adapted<'a, T: Clone> {
    value: Cow<'a, T>,
    path: AdaptationPath,
}

impl<'a, T: Clone> Adapted<'a, T> {
    pub fn path(&self) -> AdaptationPath {
        self.path
    }

    /// True when the value is the raw event itself (no copy was made).
    pub fn is_native(&self) -> bool {
        matches!(self.value, Cow::Borrowed(_))
    }

    pub fn into_inner(self) -> Cow<'a, T> {
        self.value
    }

    pub fn into_owned(self) -> T {
        self.value.into_owned()
    }
}

impl<T: Clone> core::ops::Deref for Adapted<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Stateless apart from the shared back-fill cache; cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Adapter {
    cache: Arc<AdaptationCache>,
}

impl Adapter {
    pub fn new(cache: Arc<AdaptationCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<AdaptationCache> {
        &self.cache
    }

    /// Adapt `raw` into `T`, described by `shape`.
    ///
    /// Only a payload that cannot be serialized or reshaped is an error; a
    /// refused back-fill is absorbed.
    pub fn adapt<'a, T>(
        &self,
        raw: &'a dyn Event,
        shape: &TargetShape,
    ) -> Result<Adapted<'a, T>, AdaptationFailure>
    where
        T: EventShape,
    {
        if let Some(native) = raw.as_any().downcast_ref::<T>() {
            return Ok(Adapted {
                value: Cow::Borrowed(native),
                path: AdaptationPath::NativeIdentity,
            });
        }

        let producer = ProducerType::of(raw);
        let payload = raw.payload().map_err(|source| AdaptationFailure::Serialize {
            event_name: raw.event_name().to_string(),
            producer: producer.name(),
            source,
        })?;

        let mut shaped = T::from_payload(payload, raw).map_err(|source| AdaptationFailure::Reshape {
            event_name: raw.event_name().to_string(),
            shape: shape.name().to_string(),
            source,
        })?;

        if shape.stream_name_slot() {
            self.backfill_stream_name(&mut shaped, raw, producer, shape);
        }

        Ok(Adapted {
            value: Cow::Owned(shaped),
            path: shape.reshape_path(),
        })
    }

    fn backfill_stream_name<T>(
        &self,
        shaped: &mut T,
        raw: &dyn Event,
        producer: ProducerType,
        shape: &TargetShape,
    ) where
        T: EventShape,
    {
        if self.cache.is_unsupported(producer) {
            return;
        }

        // Any refusal counts as "unsupported", whatever the reason.
        if let Err(refused) = shaped.set_stream_name(raw.stream_name()) {
            if self.cache.mark_unsupported(producer) {
                debug!(
                    producer = producer.name(),
                    shape = shape.name(),
                    reason = %refused,
                    "stream name back-fill unsupported; skipping for this producer type"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackfillRefused;
    use crate::{DynamicEvent, EventEnvelope};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value as JsonValue, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Produced and consumed as the same Rust type.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ItemAdded {
        stream: String,
        sku: String,
    }

    impl Event for ItemAdded {
        fn event_name(&self) -> &str {
            "ItemAdded"
        }

        fn stream_name(&self) -> &str {
            &self.stream
        }

        fn payload(&self) -> serde_json::Result<JsonValue> {
            serde_json::to_value(self)
        }
    }

    impl EventShape for ItemAdded {
        const NAME: &'static str = "ItemAdded";
    }

    /// A read-side view of `ItemAdded` with its own schema.
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct CartLine {
        sku: String,
        quantity: u32,
        stream_name: String,
    }

    impl EventShape for CartLine {
        const NAME: &'static str = "ItemAdded";
        const STREAM_NAME_SLOT: bool = true;

        fn set_stream_name(&mut self, stream_name: &str) -> Result<(), BackfillRefused> {
            self.stream_name = stream_name.to_string();
            Ok(())
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    struct NoSlot {
        sku: String,
    }

    impl EventShape for NoSlot {
        const NAME: &'static str = "ItemAdded";
    }

    static REFUSING_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

    /// Declares a slot but refuses every write, counting attempts.
    #[derive(Debug, Clone, Deserialize)]
    struct Refusing {}

    impl EventShape for Refusing {
        const NAME: &'static str = "ItemAdded";
        const STREAM_NAME_SLOT: bool = true;

        fn set_stream_name(&mut self, _stream_name: &str) -> Result<(), BackfillRefused> {
            REFUSING_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
            Err(BackfillRefused::Rejected("read-only".to_string()))
        }
    }

    fn envelope(payload: JsonValue) -> EventEnvelope {
        EventEnvelope::new("ItemAdded", "Cart-123", payload).unwrap()
    }

    #[test]
    fn native_identity_hands_over_the_same_value() {
        let adapter = Adapter::default();
        let raw = ItemAdded {
            stream: "Cart-123".to_string(),
            sku: "X".to_string(),
        };

        let adapted = adapter
            .adapt::<ItemAdded>(&raw, &TargetShape::of::<ItemAdded>())
            .unwrap();

        assert_eq!(adapted.path(), AdaptationPath::NativeIdentity);
        assert!(adapted.is_native());
        assert!(core::ptr::eq(&*adapted, &raw));
        assert!(adapter.cache().is_empty());
    }

    #[test]
    fn reshape_backfills_stream_name_and_defaults_missing_fields() {
        let adapter = Adapter::default();
        let raw = envelope(json!({ "sku": "X", "colour": "red" }));

        let adapted = adapter.adapt::<CartLine>(&raw, &TargetShape::of::<CartLine>()).unwrap();

        assert_eq!(adapted.path(), AdaptationPath::FixedSchema);
        assert!(!adapted.is_native());
        assert_eq!(
            adapted.into_owned(),
            CartLine {
                sku: "X".to_string(),
                quantity: 0,
                stream_name: "Cart-123".to_string(),
            }
        );
    }

    #[test]
    fn backfill_uses_producer_stream_over_payload_value() {
        let adapter = Adapter::default();
        let raw = envelope(json!({ "sku": "X", "stream_name": "stale" }));

        let adapted = adapter.adapt::<CartLine>(&raw, &TargetShape::of::<CartLine>()).unwrap();

        assert_eq!(adapted.stream_name, "Cart-123");
    }

    #[test]
    fn shapes_without_a_slot_are_never_probed() {
        let adapter = Adapter::default();
        let raw = envelope(json!({ "sku": "X" }));

        let adapted = adapter.adapt::<NoSlot>(&raw, &TargetShape::of::<NoSlot>()).unwrap();

        assert_eq!(adapted.sku, "X");
        assert!(adapter.cache().is_empty());
    }

    #[test]
    fn refused_backfill_is_attempted_once_per_producer_type() {
        let adapter = Adapter::default();
        let shape = TargetShape::of::<Refusing>();

        for n in 0..3 {
            let raw = envelope(json!({ "n": n }));
            adapter.adapt::<Refusing>(&raw, &shape).unwrap();
        }
        assert_eq!(REFUSING_ATTEMPTS.load(Ordering::SeqCst), 1);

        // A different producer type gets its own attempt.
        let other = ItemAdded {
            stream: "Cart-1".to_string(),
            sku: "Y".to_string(),
        };
        adapter.adapt::<Refusing>(&other, &shape).unwrap();

        assert_eq!(REFUSING_ATTEMPTS.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.cache().len(), 2);
    }

    #[test]
    fn incompatible_payload_is_an_adaptation_failure() {
        let adapter = Adapter::default();
        let raw = envelope(json!({ "sku": 42 }));

        let err = adapter
            .adapt::<CartLine>(&raw, &TargetShape::of::<CartLine>())
            .unwrap_err();

        assert!(matches!(err, AdaptationFailure::Reshape { ref shape, .. } if shape == "ItemAdded"));
        assert!(adapter.cache().is_empty());
    }

    #[test]
    fn open_shape_preserves_fields_and_backfills_stream() {
        let adapter = Adapter::default();
        let raw = envelope(json!({ "sku": "X", "colour": "red" }));

        let adapted = adapter
            .adapt::<DynamicEvent>(&raw, &TargetShape::open("ItemAdded"))
            .unwrap();

        assert_eq!(adapted.path(), AdaptationPath::OpenSchema);
        assert_eq!(adapted.get("colour"), Some(&json!("red")));
        assert_eq!(adapted.stream_name(), Some("Cart-123"));
        assert_eq!(adapted.event_name(), Some("ItemAdded"));
    }

    #[test]
    fn open_shape_keeps_stream_names_after_a_scalar_payload() {
        let adapter = Adapter::default();
        let shape = TargetShape::of::<DynamicEvent>();
        let published = [
            EventEnvelope::new("ItemAdded", "Cart-1", json!({ "sku": "A" })).unwrap(),
            EventEnvelope::new("Tick", "Clock-1", json!(7)).unwrap(),
            EventEnvelope::new("ItemAdded", "Cart-2", json!({ "sku": "B" })).unwrap(),
        ];

        let seen: Vec<_> = published
            .iter()
            .map(|raw| {
                let adapted = adapter.adapt::<DynamicEvent>(raw, &shape).unwrap();
                (
                    adapted.event_name().map(str::to_string),
                    adapted.stream_name().map(str::to_string),
                )
            })
            .collect();

        assert_eq!(
            seen,
            vec![
                (Some("ItemAdded".to_string()), Some("Cart-1".to_string())),
                (Some("Tick".to_string()), Some("Clock-1".to_string())),
                (Some("ItemAdded".to_string()), Some("Cart-2".to_string())),
            ]
        );
        assert!(adapter.cache().is_empty());
    }
}
