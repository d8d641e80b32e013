//! Open (loosely-typed) projections and extensible metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::BackfillRefused;
use crate::event::{Event, ProducerType};
use crate::shape::{EventShape, ShapeKind};

/// Field that receives the producer's stream name on map-shaped open payloads.
pub const STREAM_NAME_FIELD: &str = "stream_name";

/// Metadata key recording the producer's stream name on open projections.
pub const STREAM_NAME_KEY: &str = "stream_name";

/// Metadata key recording the raw event's name on open projections.
pub const EVENT_NAME_KEY: &str = "event_name";

/// Metadata key recording the Rust type that produced the event.
pub const PRODUCER_TYPE_KEY: &str = "producer_type";

/// Free-form key/value metadata carried next to an event body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, JsonValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Copy every entry of `other` into `self`, overwriting duplicate keys.
    pub fn extend_from(&mut self, other: &Metadata) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }
}

/// Values that carry mutable, extensible metadata.
pub trait ExtensibleMetadata {
    fn metadata(&self) -> &Metadata;

    fn metadata_mut(&mut self) -> &mut Metadata;
}

/// Open projection of any event: every payload field is preserved.
///
/// Handlers declare `DynamicEvent` when they want an event *shape* rather
/// than a Rust type, e.g. "anything named `ItemAdded` in the `Cart` streams".
/// The payload is kept as raw JSON, so it can be a map of fields or, for
/// newtype-like producers, a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicEvent {
    fields: JsonValue,

    #[serde(skip)]
    metadata: Metadata,
}

impl DynamicEvent {
    pub fn new(fields: JsonValue) -> Self {
        Self {
            fields,
            metadata: Metadata::default(),
        }
    }

    /// Name of the event this projection was built from.
    pub fn event_name(&self) -> Option<&str> {
        self.metadata.get_str(EVENT_NAME_KEY)
    }

    /// Stream name back-filled from the producer, whatever the payload's form.
    pub fn stream_name(&self) -> Option<&str> {
        self.metadata.get_str(STREAM_NAME_KEY)
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &JsonValue {
        &self.fields
    }

    pub fn into_fields(self) -> JsonValue {
        self.fields
    }
}

impl ExtensibleMetadata for DynamicEvent {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl EventShape for DynamicEvent {
    const NAME: &'static str = "DynamicEvent";
    const KIND: ShapeKind = ShapeKind::Open;
    const STREAM_NAME_SLOT: bool = true;

    fn from_payload(payload: JsonValue, source: &dyn Event) -> serde_json::Result<Self> {
        let mut shaped = DynamicEvent::new(payload);

        if let Some(metadata) = source.metadata() {
            shaped.metadata.extend_from(metadata);
        }
        shaped.metadata.insert(EVENT_NAME_KEY, source.event_name());
        shaped
            .metadata
            .insert(PRODUCER_TYPE_KEY, ProducerType::of(source).name());

        Ok(shaped)
    }

    fn set_stream_name(&mut self, stream_name: &str) -> Result<(), BackfillRefused> {
        self.metadata.insert(STREAM_NAME_KEY, stream_name);
        if let JsonValue::Object(fields) = &mut self.fields {
            fields.insert(STREAM_NAME_FIELD.to_string(), JsonValue::from(stream_name));
        }
        Ok(())
    }
}
