//! Abandoned-entry sweeper.
//!
//! Entries are normally removed by their waiter. Anything older than the
//! configured TTL has lost its waiter somehow and is dropped here so the
//! store stays bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::store::CorrelationStore;
use crate::telemetry::metrics;

/// Configuration for the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Entries older than this are removed.
    pub entry_ttl: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            entry_ttl: Duration::from_secs(120),
        }
    }
}

/// Periodic cleanup loop over the correlation store.
#[derive(Clone)]
pub struct Sweeper {
    store: Arc<CorrelationStore>,
    config: SweepConfig,
    shutdown: Arc<Notify>,
}

impl Sweeper {
    pub fn new(store: Arc<CorrelationStore>, config: SweepConfig) -> Self {
        Self {
            store,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the loop to stop. Safe to call before `run` starts.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// One pass. Returns the number of entries removed.
    pub fn sweep_once(&self) -> usize {
        let removed = self.store.sweep(self.config.entry_ttl);
        if removed > 0 {
            warn!(removed, ttl = ?self.config.entry_ttl, "swept abandoned entries");
            metrics::entries_swept().add(removed as u64, &[]);
        } else {
            debug!("sweep found nothing to remove");
        }
        removed
    }

    /// Run until [`Sweeper::shutdown`] is called.
    pub async fn run(&self) {
        info!(interval = ?self.config.interval, "sweeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("sweeper shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.config.interval) => {
                    self.sweep_once();
                }
            }
        }
    }
}
