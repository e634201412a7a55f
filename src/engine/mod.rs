//! Correlation engine: dispatch, result collection, bounded wait, cleanup.
//!
//! [`Relay`] wires the pieces around one shared [`CorrelationStore`] and is
//! the handle the HTTP layer works with.

pub mod collect;
pub mod dispatch;
pub mod sweep;
pub mod wait;

pub use collect::{Collector, Delivery};
pub use dispatch::{Dispatched, Dispatcher};
pub use sweep::{SweepConfig, Sweeper};
pub use wait::{WaitConfig, WaitCoordinator};

use std::sync::Arc;

use opentelemetry::KeyValue;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::event::WorkerEvent;
use crate::model::{Answer, ResultDelivery, StoreCounts, Submission};
use crate::outbound::{BroadcastOutbound, Outbound};
use crate::store::CorrelationStore;
use crate::telemetry::metrics;
use crate::telemetry::relay::{
    record_outcome, record_request_id, record_state_transition, start_request_span,
};

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub wait: WaitConfig,
    pub sweep: SweepConfig,
    /// Buffered events per worker socket before it starts lagging.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            sweep: SweepConfig::default(),
            channel_capacity: 64,
        }
    }
}

/// The correlation engine. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct Relay {
    store: Arc<CorrelationStore>,
    outbound: BroadcastOutbound,
    dispatcher: Dispatcher,
    collector: Collector,
    waiter: WaitCoordinator,
    sweeper: Sweeper,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        let store = Arc::new(CorrelationStore::new());
        let outbound = BroadcastOutbound::new(config.channel_capacity);

        Self {
            dispatcher: Dispatcher::new(Arc::clone(&store), Arc::new(outbound.clone())),
            collector: Collector::new(Arc::clone(&store)),
            waiter: WaitCoordinator::new(Arc::clone(&store), config.wait),
            sweeper: Sweeper::new(Arc::clone(&store), config.sweep),
            outbound,
            store,
        }
    }

    /// Dispatch a submission and wait for its answer.
    pub async fn submit(&self, submission: Submission) -> Result<Answer> {
        let task = Dispatcher::validate(submission)?;
        let span = start_request_span(&task.model);
        let Dispatched { id, task, .. } = span.in_scope(|| self.dispatcher.dispatch_task(task));
        record_request_id(&span, &id);

        let outcome = self.waiter.wait(id).instrument(span.clone()).await;
        let model = KeyValue::new("model", task.model.clone());

        match outcome {
            Ok(completion) => {
                record_state_transition(&span, "pending", "completed");
                record_outcome(&span, "completed");
                metrics::requests_completed().add(1, &[model]);
                Ok(Answer {
                    request_id: id,
                    model: task.model,
                    prompt: task.prompt,
                    result: completion.result,
                })
            }
            Err(e @ Error::Timeout { .. }) => {
                record_outcome(&span, "timeout");
                metrics::requests_timed_out().add(1, &[model]);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Hand a worker result to the collector.
    pub fn deliver(&self, delivery: ResultDelivery) -> Result<Delivery> {
        self.collector.deliver(delivery)
    }

    pub fn status(&self) -> StoreCounts {
        self.store.counts()
    }

    /// Attach a worker. The receiver sees every request dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.outbound.subscribe()
    }

    /// Worker sockets currently attached.
    pub fn workers(&self) -> usize {
        self.outbound.subscriber_count()
    }

    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn waiter(&self) -> &WaitCoordinator {
        &self.waiter
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub fn wait_config(&self) -> WaitConfig {
        self.waiter.config()
    }
}
