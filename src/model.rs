//! Core data model.
//!
//! A work item is one prompt waiting on the worker. It has identity (the
//! correlation id), a task payload, and a two-step lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Model used when a submission does not name one.
pub const DEFAULT_MODEL: &str = "claude";

// ---------------------------------------------------------------------------
// Request Id
// ---------------------------------------------------------------------------

/// Correlation id shared between the caller, the worker and the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Full form: workers echo it back verbatim
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Published to the worker, no result yet.
    Pending,
    /// Result attached, waiting to be collected by the caller.
    Completed,
}

impl State {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: State) -> bool {
        matches!((self, to), (State::Pending, State::Completed))
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Pending => "pending",
            State::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// What the worker is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub model: String,
    pub prompt: String,
}

impl Task {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

/// A result as delivered by the worker. Model and prompt are echoes kept
/// for the audit log only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Completion {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            model: None,
            prompt: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// An in-flight request tracked by the correlation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: RequestId,
    pub task: Task,
    pub state: State,
    /// Present once the worker delivered.
    pub result: Option<Completion>,
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    pub(crate) fn pending(id: RequestId, task: Task) -> Self {
        Self {
            id,
            task,
            state: State::Pending,
            result: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound / outbound shapes
// ---------------------------------------------------------------------------

/// A submission as it arrives from a caller. Both fields are optional on the
/// wire so that missing values become client errors instead of parse errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Submission {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: Some(prompt.into()),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A result delivery as it arrives from the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultDelivery {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ResultDelivery {
    pub fn new(request_id: impl ToString, result: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.to_string()),
            result: Some(result.into()),
            model: None,
            prompt: None,
        }
    }
}

/// What a caller gets back once its request is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub request_id: RequestId,
    pub model: String,
    pub prompt: String,
    pub result: String,
}

/// Snapshot of store occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub pending: usize,
    pub completed: usize,
}
