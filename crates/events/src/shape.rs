//! Declared handler shapes.
//!
//! A handler declares the shape it wants to receive by its parameter type.
//! The type's [`EventShape`] impl is turned into a [`TargetShape`] once, when
//! the binding is built, and drives both filtering and adaptation.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use duckbind_core::{AggregateType, event_stream_name};

use crate::dynamic::DynamicEvent;
use crate::error::BackfillRefused;
use crate::event::Event;

/// Shape names that stand for "any event".
pub const GENERIC_SHAPE_NAMES: [&str; 3] = ["Event", "Object", DynamicEvent::NAME];

/// How a reshaped payload is turned into the target value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    /// Concrete schema: missing fields take defaults, unknown fields are dropped.
    Fixed,
    /// Open schema: every payload field is preserved.
    Open,
}

/// Which path an adaptation took.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AdaptationPath {
    /// The raw event already was the target type.
    NativeIdentity,
    FixedSchema,
    OpenSchema,
}

/// A type handlers can declare as their event parameter.
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Deserialize)]
/// #[serde(default)]
/// struct ItemAdded { sku: String, stream_name: String }
///
/// impl EventShape for ItemAdded {
///     const NAME: &'static str = "ItemAdded";
///     const STREAM_NAME_SLOT: bool = true;
///
///     fn owner_stream() -> Option<&'static str> {
///         Some(event_stream_name::<Cart>())
///     }
///
///     fn set_stream_name(&mut self, stream_name: &str) -> Result<(), BackfillRefused> {
///         self.stream_name = stream_name.to_string();
///         Ok(())
///     }
/// }
/// ```
pub trait EventShape: Clone + DeserializeOwned + Send + Sync + 'static {
    /// Declared type name; doubles as the event-name pattern.
    const NAME: &'static str;

    const KIND: ShapeKind = ShapeKind::Fixed;

    /// Whether [`EventShape::set_stream_name`] is implemented.
    const STREAM_NAME_SLOT: bool = false;

    /// Canonical stream name of the aggregate this shape is nested under.
    fn owner_stream() -> Option<&'static str> {
        None
    }

    /// Build the shape from a serialized payload.
    fn from_payload(payload: JsonValue, _source: &dyn Event) -> serde_json::Result<Self> {
        serde_json::from_value(payload)
    }

    /// Write the producer's stream name onto the reshaped value.
    fn set_stream_name(&mut self, _stream_name: &str) -> Result<(), BackfillRefused> {
        Err(BackfillRefused::NoSlot)
    }
}

/// Descriptor of what a binding's handler expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetShape {
    name: Cow<'static, str>,
    kind: ShapeKind,
    owner_stream: Option<Cow<'static, str>>,
    stream_name_slot: bool,
}

impl TargetShape {
    /// Descriptor declared by a shape type.
    pub fn of<T: EventShape>() -> Self {
        Self {
            name: Cow::Borrowed(T::NAME),
            kind: T::KIND,
            owner_stream: T::owner_stream().map(Cow::Borrowed),
            stream_name_slot: T::STREAM_NAME_SLOT,
        }
    }

    /// Open shape matching events named `name`, projected as [`DynamicEvent`].
    pub fn open(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::of::<DynamicEvent>()
        }
    }

    /// Nest the shape under an aggregate type's stream.
    pub fn nested_under<A>(mut self) -> Self
    where
        A: AggregateType + ?Sized,
    {
        self.owner_stream = Some(Cow::Borrowed(event_stream_name::<A>()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn owner_stream(&self) -> Option<&str> {
        self.owner_stream.as_deref()
    }

    /// Whether the shape declares a writable stream-name slot.
    pub fn stream_name_slot(&self) -> bool {
        self.stream_name_slot
    }

    /// True when the shape name stands for "any event".
    pub fn is_generic(&self) -> bool {
        GENERIC_SHAPE_NAMES
            .iter()
            .any(|generic| *generic == self.name())
    }

    /// Path taken when the raw event is not natively the target type.
    pub fn reshape_path(&self) -> AdaptationPath {
        match self.kind {
            ShapeKind::Fixed => AdaptationPath::FixedSchema,
            ShapeKind::Open => AdaptationPath::OpenSchema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Cart;

    impl AggregateType for Cart {
        const AGGREGATE_TYPE: &'static str = "Cart";
    }

    #[derive(Debug, Clone, Deserialize)]
    struct AnyEvent;

    impl EventShape for AnyEvent {
        const NAME: &'static str = "Event";
    }

    #[test]
    fn descriptor_follows_the_declared_type() {
        let shape = TargetShape::of::<DynamicEvent>();

        assert_eq!(shape.name(), "DynamicEvent");
        assert_eq!(shape.kind(), ShapeKind::Open);
        assert!(shape.stream_name_slot());
        assert!(shape.is_generic());
        assert_eq!(shape.owner_stream(), None);
    }

    #[test]
    fn fixed_shapes_default_to_no_slot() {
        let shape = TargetShape::of::<AnyEvent>();

        assert_eq!(shape.kind(), ShapeKind::Fixed);
        assert!(!shape.stream_name_slot());
        assert_eq!(shape.reshape_path(), AdaptationPath::FixedSchema);
    }

    #[test]
    fn named_open_shape_is_not_generic() {
        let shape = TargetShape::open("ItemAdded").nested_under::<Cart>();

        assert_eq!(shape.name(), "ItemAdded");
        assert_eq!(shape.kind(), ShapeKind::Open);
        assert_eq!(shape.owner_stream(), Some("Cart"));
        assert!(!shape.is_generic());
    }
}
