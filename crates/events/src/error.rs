//! Binding, adaptation and dispatch errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;

/// A binding could not be built. Raised at construction, never at dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("binding for shape `{shape}` has no handler")]
    MissingHandler { shape: String },

    #[error("shape `{shape}` is declared {declared:?} but the binding requested {requested:?}")]
    ShapeKindMismatch {
        shape: String,
        declared: crate::ShapeKind,
        requested: crate::ShapeKind,
    },
}

/// The payload of a raw event could not be reshaped into the target shape.
#[derive(Debug, Error)]
pub enum AdaptationFailure {
    #[error("failed to serialize `{event_name}` produced by {producer}: {source}")]
    Serialize {
        event_name: String,
        producer: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to reshape `{event_name}` into `{shape}`: {source}")]
    Reshape {
        event_name: String,
        shape: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A shaped value declined the stream-name back-fill.
///
/// Not an error for dispatch: the adapter caches it and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackfillRefused {
    #[error("shape has no stream name slot")]
    NoSlot,

    #[error("stream name slot rejected the value: {0}")]
    Rejected(String),
}

/// Dispatching one event to one binding failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Adaptation(#[from] AdaptationFailure),

    #[error("handler failed: {0:#}")]
    Handler(#[source] anyhow::Error),
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DispatchError::Adaptation(_) => FailureKind::Adaptation,
            DispatchError::Handler(_) => FailureKind::Handler,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Adaptation,
    Handler,
}

/// Out-of-band report of a failed dispatch, published on an error bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandlingError {
    pub subscriber: String,
    pub event_name: String,
    pub stream_name: String,
    pub kind: FailureKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl EventHandlingError {
    pub fn new(subscriber: impl Into<String>, event: &dyn Event, error: &DispatchError) -> Self {
        Self {
            subscriber: subscriber.into(),
            event_name: event.event_name().to_string(),
            stream_name: event.stream_name().to_string(),
            kind: error.kind(),
            message: error.to_string(),
            occurred_at: Utc::now(),
        }
    }
}
