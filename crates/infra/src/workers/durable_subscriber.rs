use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use duckbind_events::{EventBus, Subscription};

use crate::config::SubscriberConfig;

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("failed to spawn subscriber worker `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to a running durable subscription.
///
/// Dropping the handle stops delivery without waiting; [`dispose`] stops it
/// and waits for in-flight dispatches to finish.
///
/// [`dispose`]: SubscriptionHandle::dispose
#[derive(Debug)]
#[must_use = "dropping the handle stops the subscription"]
pub struct SubscriptionHandle {
    name: String,
    stop: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        !self.stop.load(Ordering::Acquire) && self.workers.iter().any(|w| !w.is_finished())
    }

    /// Request shutdown and wait for every worker to stop.
    ///
    /// No dispatch starts after this is called; one already running is
    /// allowed to complete.
    pub fn dispose(mut self) {
        self.stop.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!(subscriber = %self.name, "subscriber worker panicked");
            }
        }
        info!(subscriber = %self.name, "subscription disposed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

/// Durable subscription worker pool.
///
/// - Pulls messages from one bus subscription (shared by `workers` threads)
/// - Skips messages the predicate rejects
/// - Reports handler failures on an error bus and keeps going
/// - Supports graceful shutdown through [`SubscriptionHandle`]
#[derive(Debug)]
pub struct DurableSubscriber;

impl DurableSubscriber {
    /// Spawn the worker threads for `subscription`.
    ///
    /// `handler` failures never end the subscription: each one is logged and
    /// published on `errors`.
    pub fn spawn<M, P, H, R, E>(
        name: impl Into<String>,
        subscription: Subscription<M>,
        predicate: P,
        handler: H,
        errors: E,
        config: SubscriberConfig,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        M: Send + 'static,
        P: Fn(&M) -> bool + Send + Sync + 'static,
        H: Fn(M) -> Result<(), R> + Send + Sync + 'static,
        R: core::fmt::Debug + Send + 'static,
        E: EventBus<R> + 'static,
    {
        let name = name.into();
        let stop = Arc::new(AtomicBool::new(false));
        let worker = Arc::new(Worker {
            name: name.clone(),
            subscription: Mutex::new(subscription),
            predicate,
            handler,
            errors,
            config,
        });

        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker = worker.clone();
            let stop_flag = stop.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker.run(&stop_flag));

            match spawned {
                Ok(join) => workers.push(join),
                Err(source) => {
                    // Already-running workers see the flag and exit.
                    stop.store(true, Ordering::Release);
                    return Err(SubscribeError::Spawn { name, source });
                }
            }
        }

        info!(subscriber = %name, workers = workers.len(), "durable subscription started");

        Ok(SubscriptionHandle {
            name,
            stop,
            workers,
        })
    }
}

struct Worker<M, P, H, E> {
    name: String,
    subscription: Mutex<Subscription<M>>,
    predicate: P,
    handler: H,
    errors: E,
    config: SubscriberConfig,
}

impl<M, P, H, R, E> Worker<M, P, H, E>
where
    P: Fn(&M) -> bool,
    H: Fn(M) -> Result<(), R>,
    R: core::fmt::Debug,
    E: EventBus<R>,
{
    fn run(&self, stop: &AtomicBool) {
        loop {
            // Shutdown check (non-blocking)
            if stop.load(Ordering::Acquire) {
                break;
            }

            let received = self
                .subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv_timeout(self.config.poll_interval);

            match received {
                Ok(msg) => {
                    // Nothing new starts once disposal has begun.
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    if !(self.predicate)(&msg) {
                        continue;
                    }
                    if let Err(report) = (self.handler)(msg) {
                        self.report(report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!(subscriber = %self.name, "subscriber worker stopped");
    }

    fn report(&self, report: R) {
        warn!(subscriber = %self.name, error = ?report, "event handler failed; subscription continues");

        if let Err(err) = self.errors.publish(report) {
            warn!(subscriber = %self.name, error = ?err, "failed to publish handler error");
        }
    }
}
