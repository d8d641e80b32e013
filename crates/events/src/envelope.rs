use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use duckbind_core::{DomainError, DomainResult};

use crate::dynamic::Metadata;
use crate::event::Event;

/// Wire-level recorded event: a name, a stream and a JSON payload.
///
/// Producers that do not have (or do not want to share) a Rust event type
/// publish envelopes. Every handler shape other than `EventEnvelope` itself
/// receives them through structural reshaping.
///
/// Notes:
/// - `event_name` is validated non-empty at construction.
/// - `stream_name` may be empty ("ungrouped").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_id: Uuid,
    event_name: String,
    stream_name: String,

    /// When the event occurred (business time).
    occurred_at: DateTime<Utc>,

    payload: JsonValue,

    #[serde(default)]
    metadata: Metadata,
}

impl EventEnvelope {
    pub fn new(
        event_name: impl Into<String>,
        stream_name: impl Into<String>,
        payload: JsonValue,
    ) -> DomainResult<Self> {
        let event_name = event_name.into();
        if event_name.trim().is_empty() {
            return Err(DomainError::validation("event name must not be empty"));
        }

        Ok(Self {
            event_id: Uuid::now_v7(),
            event_name,
            stream_name: stream_name.into(),
            occurred_at: Utc::now(),
            payload,
            metadata: Metadata::default(),
        })
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn body(&self) -> &JsonValue {
        &self.payload
    }

    pub fn into_body(self) -> JsonValue {
        self.payload
    }
}

impl Event for EventEnvelope {
    fn event_name(&self) -> &str {
        &self.event_name
    }

    fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn payload(&self) -> serde_json::Result<JsonValue> {
        Ok(self.payload.clone())
    }

    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.metadata)
    }
}
