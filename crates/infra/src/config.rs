//! Subscriber configuration.

use std::time::Duration;

use tracing::warn;

/// Milliseconds a worker waits on the bus before re-checking for shutdown.
pub const POLL_INTERVAL_ENV: &str = "DUCKBIND_POLL_INTERVAL_MS";

/// Worker threads per durable subscription.
pub const WORKERS_ENV: &str = "DUCKBIND_SUBSCRIBER_WORKERS";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How durable subscriptions poll and fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Upper bound on shutdown latency per worker.
    pub poll_interval: Duration,
    /// Threads sharing one bus subscription (at least 1).
    pub workers: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            workers: 1,
        }
    }
}

impl SubscriberConfig {
    /// Read [`POLL_INTERVAL_ENV`] and [`WORKERS_ENV`]; unset or invalid values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let poll_interval = parse_or(&lookup, POLL_INTERVAL_ENV)
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let workers = parse_or(&lookup, WORKERS_ENV).unwrap_or(defaults.workers);

        Self::default()
            .with_poll_interval(poll_interval)
            .with_workers(workers)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

fn parse_or<T: core::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid subscriber setting");
            None
        }
    }
}
