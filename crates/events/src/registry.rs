//! A set of bindings registered by one consumer.

use std::sync::Arc;

use tracing::warn;

use crate::binding::{EventBinding, EventHandlerBinder, HandlerResult};
use crate::error::DispatchError;
use crate::event::Event;
use crate::filter::MatchEvent;
use crate::shape::EventShape;

/// Collects bindings so they can be inspected and subscribed together.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    binders: Vec<Arc<dyn EventHandlerBinder>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B>(&mut self, binder: B) -> &mut Self
    where
        B: EventHandlerBinder + 'static,
    {
        self.binders.push(Arc::new(binder));
        self
    }

    pub fn register_shared(&mut self, binder: Arc<dyn EventHandlerBinder>) -> &mut Self {
        self.binders.push(binder);
        self
    }

    /// Bind `handler` to the shape of its parameter (fresh cache per binding).
    pub fn on<T, H>(&mut self, handler: H) -> &mut Self
    where
        T: EventShape,
        H: Fn(&T) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(EventBinding::new(handler))
    }

    pub fn binders(&self) -> &[Arc<dyn EventHandlerBinder>] {
        &self.binders
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    /// Every (event-name, stream-name) pair any binding wants, deduplicated
    /// and sorted.
    pub fn included_event_types(&self) -> Vec<MatchEvent> {
        let mut types: Vec<MatchEvent> = self
            .binders
            .iter()
            .flat_map(|binder| binder.included_event_types())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Synchronously dispatch one event to every matching binding.
    ///
    /// Failures do not stop the fan-out; they are returned by binding name.
    pub fn dispatch(&self, event: &dyn Event) -> Vec<(String, DispatchError)> {
        let mut failures = Vec::new();

        for binder in self.binders.iter().filter(|b| b.filter().matches(event)) {
            if let Err(err) = binder.dispatch(event) {
                warn!(
                    binding = binder.name(),
                    event_name = event.event_name(),
                    error = %err,
                    "event dispatch failed"
                );
                failures.push((binder.name().to_string(), err));
            }
        }

        failures
    }
}

impl core::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.binders.iter().map(|b| (b.name(), b.filter())))
            .finish()
    }
}
