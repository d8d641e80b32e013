//! Handler bindings: filter + adapter + callback.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::adapter::{Adapted, Adapter};
use crate::cache::AdaptationCache;
use crate::error::{AdaptationFailure, ConfigurationError, DispatchError};
use crate::event::Event;
use crate::filter::{EventFilter, MatchEvent};
use crate::shape::{EventShape, TargetShape};

/// What handler callbacks return.
pub type HandlerResult = anyhow::Result<()>;

/// Type-erased binding, as held by registries and bus subscribers.
///
/// `dispatch` is only called for events that `filter()` matched.
pub trait EventHandlerBinder: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    fn filter(&self) -> &EventFilter;

    /// The (event-name, stream-name) pairs this binding wants to see.
    fn included_event_types(&self) -> Vec<MatchEvent> {
        vec![MatchEvent::from(self.filter())]
    }

    fn dispatch(&self, event: &dyn Event) -> Result<(), DispatchError>;
}

/// Binds a handler for shape `T` to the events that fit it.
///
/// The filter and the target shape are derived once, at construction. Each
/// binding owns (a handle to) its own [`AdaptationCache`].
pub struct EventBinding<T, H> {
    name: String,
    filter: EventFilter,
    shape: TargetShape,
    adapter: Adapter,
    handler: H,
    _shape: PhantomData<fn(&T)>,
}

impl<T, H> EventBinding<T, H>
where
    T: EventShape,
    H: Fn(&T) -> HandlerResult + Send + Sync + 'static,
{
    /// Bind `handler` to the shape declared by its parameter type.
    pub fn new(handler: H) -> Self {
        Self::assemble(None, TargetShape::of::<T>(), Arc::default(), handler)
    }

    pub fn builder() -> BindingBuilder<T, H> {
        BindingBuilder::new()
    }

    fn assemble(
        name: Option<String>,
        shape: TargetShape,
        cache: Arc<AdaptationCache>,
        handler: H,
    ) -> Self {
        let filter = EventFilter::for_shape(&shape);
        let name = name.unwrap_or_else(|| shape.name().to_string());

        debug!(binding = %name, filter = %filter, "event binding created");

        Self {
            name,
            filter,
            shape,
            adapter: Adapter::new(cache),
            handler,
            _shape: PhantomData,
        }
    }

    pub fn shape(&self) -> &TargetShape {
        &self.shape
    }

    pub fn cache(&self) -> &Arc<AdaptationCache> {
        self.adapter.cache()
    }

    /// Adapt without invoking the handler.
    pub fn adapt<'a>(&self, event: &'a dyn Event) -> Result<Adapted<'a, T>, AdaptationFailure> {
        self.adapter.adapt::<T>(event, &self.shape)
    }
}

impl<T, H> EventHandlerBinder for EventBinding<T, H>
where
    T: EventShape,
    H: Fn(&T) -> HandlerResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn dispatch(&self, event: &dyn Event) -> Result<(), DispatchError> {
        let adapted = self.adapt(event)?;
        (self.handler)(&*adapted).map_err(DispatchError::Handler)
    }
}

impl<T, H> core::fmt::Debug for EventBinding<T, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBinding")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Builder for bindings that need a name, a shared cache or an explicit
/// (e.g. open, named) shape.
///
/// ```ignore
/// let binding = EventBinding::builder()
///     .name("cart-lines")
///     .shape(TargetShape::open("ItemAdded").nested_under::<Cart>())
///     .handler(|event: &DynamicEvent| { /* ... */ Ok(()) })
///     .build()?;
/// ```
pub struct BindingBuilder<T, H> {
    name: Option<String>,
    shape: Option<TargetShape>,
    cache: Option<Arc<AdaptationCache>>,
    handler: Option<H>,
    _shape: PhantomData<fn(&T)>,
}

impl<T, H> BindingBuilder<T, H>
where
    T: EventShape,
    H: Fn(&T) -> HandlerResult + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            name: None,
            shape: None,
            cache: None,
            handler: None,
            _shape: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the shape declared by `T` (same kind required).
    pub fn shape(mut self, shape: TargetShape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn cache(mut self, cache: Arc<AdaptationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<EventBinding<T, H>, ConfigurationError> {
        let shape = self.shape.unwrap_or_else(TargetShape::of::<T>);

        if shape.kind() != T::KIND {
            return Err(ConfigurationError::ShapeKindMismatch {
                shape: shape.name().to_string(),
                declared: T::KIND,
                requested: shape.kind(),
            });
        }

        let handler = self.handler.ok_or_else(|| ConfigurationError::MissingHandler {
            shape: shape.name().to_string(),
        })?;

        Ok(EventBinding::assemble(
            self.name,
            shape,
            self.cache.unwrap_or_default(),
            handler,
        ))
    }
}

impl<T, H> Default for BindingBuilder<T, H>
where
    T: EventShape,
    H: Fn(&T) -> HandlerResult + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackfillRefused;
    use crate::filter::WILDCARD;
    use crate::{DynamicEvent, EventEnvelope};
    use duckbind_core::{AggregateType, event_stream_name};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    struct Cart;

    impl AggregateType for Cart {
        const AGGREGATE_TYPE: &'static str = "Cart";
    }

    /// `ItemAdded`, as seen from inside the `Cart` aggregate.
    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct ItemAdded {
        sku: String,
        stream_name: String,
    }

    impl EventShape for ItemAdded {
        const NAME: &'static str = "ItemAdded";
        const STREAM_NAME_SLOT: bool = true;

        fn owner_stream() -> Option<&'static str> {
            Some(event_stream_name::<Cart>())
        }

        fn set_stream_name(&mut self, stream_name: &str) -> Result<(), BackfillRefused> {
            self.stream_name = stream_name.to_string();
            Ok(())
        }
    }

    type NoHandler<T> = fn(&T) -> HandlerResult;

    fn item_added(stream: &str) -> EventEnvelope {
        EventEnvelope::new("ItemAdded", stream, json!({ "sku": "X" })).unwrap()
    }

    #[test]
    fn nested_shape_binding_filters_adapts_and_dispatches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let binding = EventBinding::new(move |event: &ItemAdded| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });

        assert_eq!(binding.filter(), &EventFilter::new("ItemAdded", "Cart"));

        let raw = item_added("Cart-123");
        assert!(binding.filter().matches(&raw));
        binding.dispatch(&raw).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ItemAdded {
                sku: "X".to_string(),
                stream_name: "Cart-123".to_string(),
            }]
        );
    }

    #[test]
    fn generic_open_binding_matches_any_name_and_stream() {
        let binding = EventBinding::new(|_: &DynamicEvent| Ok(()));

        assert_eq!(binding.filter(), &EventFilter::new(WILDCARD, ""));
        assert!(binding.filter().matches(&item_added("Cart-123")));
        assert!(binding.filter().matches(&item_added("Order-7")));
        assert_eq!(
            binding.included_event_types(),
            vec![MatchEvent {
                event_name: WILDCARD.to_string(),
                stream_name: WILDCARD.to_string(),
            }]
        );
    }

    #[test]
    fn builder_without_handler_is_a_configuration_error() {
        let err = BindingBuilder::<ItemAdded, NoHandler<ItemAdded>>::new()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::MissingHandler {
                shape: "ItemAdded".to_string()
            }
        );
    }

    #[test]
    fn builder_rejects_an_open_shape_for_a_fixed_type() {
        let err = EventBinding::builder()
            .shape(TargetShape::open("ItemAdded"))
            .handler(|_: &ItemAdded| Ok(()))
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::ShapeKindMismatch { .. }));
    }

    #[test]
    fn named_open_binding_uses_the_given_shape_and_cache() {
        let cache = Arc::new(AdaptationCache::new());
        let binding = EventBinding::builder()
            .name("cart-lines")
            .shape(TargetShape::open("ItemAdded").nested_under::<Cart>())
            .cache(cache.clone())
            .handler(|event: &DynamicEvent| {
                anyhow::ensure!(event.get("sku").is_some(), "missing sku");
                Ok(())
            })
            .build()
            .unwrap();

        assert_eq!(binding.name(), "cart-lines");
        assert_eq!(binding.filter(), &EventFilter::new("ItemAdded", "Cart"));
        assert!(Arc::ptr_eq(binding.cache(), &cache));
        binding.dispatch(&item_added("Cart-1")).unwrap();
    }

    #[test]
    fn reshape_failure_skips_the_handler() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let binding = EventBinding::new(move |_: &ItemAdded| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let raw = EventEnvelope::new("ItemAdded", "Cart-1", json!({ "sku": ["not", "text"] })).unwrap();
        let err = binding.dispatch(&raw).unwrap_err();

        assert!(matches!(err, DispatchError::Adaptation(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn handler_errors_are_returned_to_the_caller() {
        let binding = EventBinding::new(|_: &ItemAdded| anyhow::bail!("read model offline"));

        let err = binding.dispatch(&item_added("Cart-1")).unwrap_err();

        assert!(matches!(err, DispatchError::Handler(_)));
        assert_eq!(err.to_string(), "handler failed: read model offline");
    }
}
