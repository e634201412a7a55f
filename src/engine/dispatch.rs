//! Dispatcher: validate a submission, record it, publish it to the worker.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::event::WorkerEvent;
use crate::model::{DEFAULT_MODEL, RequestId, Submission, Task};
use crate::outbound::Outbound;
use crate::store::CorrelationStore;
use crate::telemetry::metrics;
use crate::telemetry::relay::truncate;

/// Characters of the prompt kept in the audit log line.
const PROMPT_PREVIEW: usize = 50;

/// A request that is in the store and has been published.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub id: RequestId,
    pub task: Task,
    /// Workers the event was handed to. Zero is not an error: the wait
    /// deadline covers the "no worker" case.
    pub receivers: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<CorrelationStore>,
    outbound: Arc<dyn Outbound>,
}

impl Dispatcher {
    pub fn new(store: Arc<CorrelationStore>, outbound: Arc<dyn Outbound>) -> Self {
        Self { store, outbound }
    }

    /// Turn a raw submission into a task. An absent model falls back to the
    /// default; an absent or empty prompt is rejected. Both are passed to
    /// the worker as given otherwise.
    pub fn validate(submission: Submission) -> Result<Task> {
        let prompt = submission
            .prompt
            .filter(|p| !p.is_empty())
            .ok_or(Error::MissingField("prompt"))?;
        let model = submission
            .model
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Task::new(model, prompt))
    }

    /// Validate and dispatch in one step.
    pub fn dispatch(&self, submission: Submission) -> Result<Dispatched> {
        Self::validate(submission).map(|task| self.dispatch_task(task))
    }

    /// Record the task and publish it. The entry exists before any worker
    /// can see the id.
    pub fn dispatch_task(&self, task: Task) -> Dispatched {
        let id = self.store.create(task.clone());

        info!(
            request_id = %id,
            model = %task.model,
            prompt = %truncate(&task.prompt, PROMPT_PREVIEW),
            "new request"
        );

        let receivers = self.outbound.publish(WorkerEvent::NewRequest {
            request_id: id,
            model: task.model.clone(),
            prompt: task.prompt.clone(),
        });
        if receivers == 0 {
            warn!(request_id = %id, "no worker connected, request will wait for one");
        }

        metrics::requests_dispatched().add(
            1,
            &[
                KeyValue::new("model", task.model.clone()),
                KeyValue::new("delivered", receivers > 0),
            ],
        );

        Dispatched {
            id,
            task,
            receivers,
        }
    }
}
