//! Subscribing bindings to a live event bus.
//!
//! ```text
//! EventBus<SharedEvent> ──subscribe──▶ DurableSubscriber
//!                                         │ binding.filter().matches(event)?
//!                                         ▼
//!                                      binding.dispatch(event)
//!                                         │ Err(..)
//!                                         ▼
//!                              EventBus<EventHandlingError>
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::info;

use duckbind_events::{
    DispatchError, Event, EventBus, EventHandlerBinder, EventHandlingError, HandlerRegistry,
    SharedEvent,
};

use crate::config::SubscriberConfig;
use crate::workers::{DurableSubscriber, SubscribeError, SubscriptionHandle};

/// Subscribes bindings to a bus, publishing per-event failures on `errors`.
#[derive(Debug, Clone)]
pub struct BusSubscriber<E> {
    errors: E,
    config: SubscriberConfig,
}

impl<E> BusSubscriber<E>
where
    E: EventBus<EventHandlingError> + Clone + 'static,
{
    pub fn new(errors: E) -> Self {
        Self::with_config(errors, SubscriberConfig::default())
    }

    pub fn with_config(errors: E, config: SubscriberConfig) -> Self {
        Self { errors, config }
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    /// Route every bus event matching `binding.filter()` into
    /// `binding.dispatch`, durably.
    pub fn subscribe<B>(
        &self,
        binding: Arc<dyn EventHandlerBinder>,
        bus: &B,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        B: EventBus<SharedEvent> + ?Sized,
    {
        let name = binding.name().to_string();
        info!(
            subscriber = %name,
            filter = %binding.filter(),
            workers = self.config.workers,
            "subscribing binding to bus"
        );

        let filter_binding = binding.clone();
        DurableSubscriber::spawn(
            name,
            bus.subscribe(),
            move |event: &SharedEvent| filter_binding.filter().matches(event.as_ref()),
            move |event: SharedEvent| dispatch_guarded(binding.as_ref(), event.as_ref()),
            self.errors.clone(),
            self.config,
        )
    }

    /// Subscribe every binding in `registry`, one subscription each.
    ///
    /// If any subscription fails to start, the ones already started are
    /// disposed before the error is returned.
    pub fn subscribe_registry<B>(
        &self,
        registry: &HandlerRegistry,
        bus: &B,
    ) -> Result<Vec<SubscriptionHandle>, SubscribeError>
    where
        B: EventBus<SharedEvent> + ?Sized,
    {
        let mut handles = Vec::with_capacity(registry.len());

        for binding in registry.binders() {
            match self.subscribe(binding.clone(), bus) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    handles.into_iter().for_each(SubscriptionHandle::dispose);
                    return Err(err);
                }
            }
        }

        Ok(handles)
    }
}

/// Dispatch one event, turning handler panics into handler failures.
fn dispatch_guarded(
    binding: &dyn EventHandlerBinder,
    event: &dyn Event,
) -> Result<(), EventHandlingError> {
    panic::catch_unwind(AssertUnwindSafe(|| binding.dispatch(event)))
        .unwrap_or_else(|payload| {
            Err(DispatchError::Handler(anyhow!(
                "handler panicked: {}",
                panic_message(&*payload)
            )))
        })
        .map_err(|err| EventHandlingError::new(binding.name(), event, &err))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
