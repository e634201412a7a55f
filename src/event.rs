//! Messages exchanged with the worker over the push channel.
//!
//! Every frame is `{"event": <name>, "data": {...}}`. Outbound events are
//! the relay's voice; inbound messages are the worker's.

use serde::{Deserialize, Serialize};

use crate::model::{RequestId, ResultDelivery};

/// Server → worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// Greeting sent once when a worker attaches.
    Connected { message: String },
    /// A prompt for the worker to run.
    NewRequest {
        request_id: RequestId,
        model: String,
        prompt: String,
    },
}

impl WorkerEvent {
    pub fn connected() -> Self {
        WorkerEvent::Connected {
            message: "Connected to relay server".to_string(),
        }
    }

    /// Name as it appears in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Connected { .. } => "connected",
            WorkerEvent::NewRequest { .. } => "new_request",
        }
    }
}

/// Worker → server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Same payload and semantics as `POST /api/result`.
    Result(ResultDelivery),
    /// Anything else the worker sends. Logged and ignored.
    #[serde(other)]
    Unknown,
}
