//! JSON bodies returned by the API. Shared with [`crate::client`].

use serde::{Deserialize, Serialize};

use crate::model::{Answer, StoreCounts};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_ONLINE: &str = "online";

pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const RESULT_FIELDS_REQUIRED: &str = "request_id and result are required";
pub const REQUEST_TIMEOUT: &str = "Request timeout - make sure the browser page is open";
pub const RESULT_STORED: &str = "Result stored";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: String,
    pub message: String,
}

impl ErrorReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
        }
    }
}

/// `POST /api/process` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReply {
    pub status: String,
    #[serde(flatten)]
    pub answer: Answer,
}

impl From<Answer> for ProcessReply {
    fn from(answer: Answer) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            answer,
        }
    }
}

/// `POST /api/result` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckReply {
    pub status: String,
    pub message: String,
}

impl AckReply {
    pub fn stored() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: RESULT_STORED.to_string(),
        }
    }
}

/// `GET /api/status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
    pub pending_requests: usize,
    pub completed_results: usize,
    #[serde(default)]
    pub connected_workers: usize,
}

impl StatusReply {
    pub fn online(counts: StoreCounts, workers: usize) -> Self {
        Self {
            status: STATUS_ONLINE.to_string(),
            pending_requests: counts.pending,
            completed_results: counts.completed,
            connected_workers: workers,
        }
    }
}
