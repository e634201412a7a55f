//! Error types for prompt-relay.

use std::time::Duration;

use thiserror::Error;

use crate::model::RequestId;

#[derive(Debug, Error)]
pub enum Error {
    /// A required request field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// No result arrived for the request before its deadline. Retryable.
    #[error("request {request_id} timed out after {after:?}")]
    Timeout { request_id: RequestId, after: Duration },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Client input problems never reach the correlation store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MissingField(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
