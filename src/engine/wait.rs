//! Wait coordinator: hold the caller until its result lands or the deadline
//! passes.
//!
//! The result arrives on an unrelated request (the worker's delivery), so the
//! only meeting point is the store. The coordinator polls it at a fixed
//! interval; the observed timeout is at least `timeout` and at most
//! `timeout + poll_interval`.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Completion, RequestId};
use crate::store::CorrelationStore;
use crate::telemetry::metrics;

/// Timing for a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Upper bound on how long a caller waits for its result.
    pub timeout: Duration,
    /// How often the store is checked.
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct WaitCoordinator {
    store: Arc<CorrelationStore>,
    config: WaitConfig,
}

/// Removes the entry if the waiting future is dropped before it finishes,
/// e.g. when the HTTP caller disconnects.
struct EntryGuard<'a> {
    store: &'a CorrelationStore,
    id: RequestId,
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        if self.store.remove(self.id) {
            debug!(request_id = %self.id, "caller stopped waiting, entry released");
        }
    }
}

impl WaitCoordinator {
    pub fn new(store: Arc<CorrelationStore>, config: WaitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> WaitConfig {
        self.config
    }

    /// Wait for the result of `id`, consuming the entry on success and
    /// removing it on timeout.
    pub async fn wait(&self, id: RequestId) -> Result<Completion> {
        let _guard = EntryGuard {
            store: &self.store,
            id,
        };
        let started = Instant::now();
        let deadline = started + self.config.timeout;

        loop {
            if let Some(completion) = self.store.try_take_completed(id) {
                record_wait(started, "completed");
                return Ok(completion);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }

        self.store.remove(id);
        record_wait(started, "timeout");
        warn!(request_id = %id, "request timeout, is the worker page open?");

        Err(Error::Timeout {
            request_id: id,
            after: self.config.timeout,
        })
    }
}

fn record_wait(started: Instant, outcome: &'static str) {
    metrics::wait_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("outcome", outcome)],
    );
}
