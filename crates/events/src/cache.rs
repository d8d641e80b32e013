//! Per-producer-type memo of failed stream-name back-fills.

use core::any::TypeId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::event::ProducerType;

/// Remembers which producer event types a binding's shape cannot back-fill.
///
/// - Insert-only: entries are never removed for the lifetime of the cache.
/// - Concurrent readers and writers need no external locking. Two threads
///   racing to mark the same type both succeed; the second insert is a no-op.
#[derive(Debug, Default)]
pub struct AdaptationCache {
    unsupported: RwLock<HashMap<TypeId, &'static str>>,
}

impl AdaptationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unsupported(&self, producer: ProducerType) -> bool {
        // Insert-only map: a poisoned guard still holds a consistent map.
        self.unsupported
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&producer.id())
    }

    /// Returns `true` if this call recorded the type for the first time.
    pub fn mark_unsupported(&self, producer: ProducerType) -> bool {
        self.unsupported
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(producer.id(), producer.name())
            .is_none()
    }

    pub fn len(&self) -> usize {
        self.unsupported
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the producer types marked so far (unordered).
    pub fn unsupported_types(&self) -> Vec<&'static str> {
        self.unsupported
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .copied()
            .collect()
    }
}
