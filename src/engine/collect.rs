//! Result collector: accept a worker's result and complete the matching entry.

use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{Completion, RequestId, ResultDelivery};
use crate::store::CorrelationStore;
use crate::telemetry::metrics;
use crate::telemetry::relay::truncate;

/// Characters of the result kept in the audit log line.
const RESULT_PREVIEW: usize = 100;

/// What happened to a delivered result. Both outcomes are success from the
/// worker's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Attached to a pending request.
    Accepted(RequestId),
    /// No pending request under that id (timed out, already answered, or
    /// never issued). The result is dropped.
    Unknown(String),
}

impl Delivery {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Delivery::Accepted(_))
    }
}

#[derive(Clone)]
pub struct Collector {
    store: Arc<CorrelationStore>,
}

impl Collector {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }

    /// Deliver a worker result. Only missing fields are errors.
    pub fn deliver(&self, delivery: ResultDelivery) -> Result<Delivery> {
        let (raw_id, result) = match (delivery.request_id, delivery.result) {
            (Some(id), Some(result)) if !id.trim().is_empty() && !result.is_empty() => {
                (id, result)
            }
            _ => {
                warn!("result delivery missing request_id or result");
                return Err(Error::MissingField("request_id and result"));
            }
        };

        let completion = Completion {
            result,
            model: delivery.model,
            prompt: delivery.prompt,
        };
        let preview = truncate(&completion.result, RESULT_PREVIEW);

        let accepted = raw_id
            .parse::<RequestId>()
            .ok()
            .filter(|id| self.store.complete(*id, completion));

        let outcome = match accepted {
            Some(id) => {
                info!(request_id = %id, result = %preview, "result received");
                Delivery::Accepted(id)
            }
            None => {
                warn!(
                    request_id = %raw_id,
                    result = %preview,
                    "result for unknown or expired request dropped"
                );
                Delivery::Unknown(raw_id)
            }
        };

        metrics::results_received().add(
            1,
            &[KeyValue::new(
                "outcome",
                if outcome.is_accepted() { "accepted" } else { "unknown" },
            )],
        );

        Ok(outcome)
    }
}
