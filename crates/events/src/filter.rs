//! Event-name × stream-name filtering.

use serde::{Deserialize, Serialize};

use duckbind_core::stream_category;

use crate::event::Event;
use crate::shape::TargetShape;

/// Pattern value that matches any event name or stream name.
pub const WILDCARD: &str = "*";

/// Which events a binding wants to see.
///
/// - An event-name pattern is either an exact name or [`WILDCARD`]; it is
///   never empty.
/// - An empty stream-name pattern skips the stream check entirely.
/// - A non-empty stream-name pattern matches the exact stream name, the
///   stream's category (`"Cart"` matches `"Cart-123"`), or anything when it
///   is [`WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFilter {
    event_name: String,
    stream_name: String,
}

impl EventFilter {
    /// An empty event-name pattern is normalised to [`WILDCARD`].
    pub fn new(event_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        let event_name = event_name.into();
        let event_name = if event_name.is_empty() {
            WILDCARD.to_string()
        } else {
            event_name
        };

        Self {
            event_name,
            stream_name: stream_name.into(),
        }
    }

    /// Matches every event on every stream.
    pub fn any() -> Self {
        Self::new(WILDCARD, "")
    }

    /// Derive the filter for a handler shape.
    ///
    /// Generic shape names (`Event`, `Object`, `DynamicEvent`) become the
    /// wildcard; a shape nested under an aggregate filters on that
    /// aggregate's stream name.
    pub fn for_shape(shape: &TargetShape) -> Self {
        let event_name = if shape.is_generic() {
            WILDCARD
        } else {
            shape.name()
        };

        Self::new(event_name, shape.owner_stream().unwrap_or_default())
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn matches(&self, event: &dyn Event) -> bool {
        self.matches_parts(event.event_name(), event.stream_name())
    }

    /// Match on raw names (no event needed).
    ///
    /// The event-name pattern matches on [`WILDCARD`] or equality. A non-empty
    /// stream-name pattern also accepts the stream's category, so `"Cart"`
    /// matches `"Cart-123"`; see [`stream_category`].
    pub fn matches_parts(&self, event_name: &str, stream_name: &str) -> bool {
        let name_matches = self.event_name == WILDCARD || self.event_name == event_name;

        if self.stream_name.is_empty() {
            return name_matches;
        }

        name_matches
            && (self.stream_name == WILDCARD
                || self.stream_name == stream_name
                || self.stream_name == stream_category(stream_name))
    }
}

impl core::fmt::Display for EventFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.event_name, self.stream_name)
    }
}

/// One (event-name, stream-name) pair a registration wants to see.
///
/// Unlike [`EventFilter`], "any stream" is always spelled [`WILDCARD`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchEvent {
    pub event_name: String,
    pub stream_name: String,
}

impl From<&EventFilter> for MatchEvent {
    fn from(filter: &EventFilter) -> Self {
        let stream_name = if filter.stream_name().is_empty() {
            WILDCARD
        } else {
            filter.stream_name()
        };

        Self {
            event_name: filter.event_name().to_string(),
            stream_name: stream_name.to_string(),
        }
    }
}
