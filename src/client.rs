//! HTTP client for a running relay. Used by the CLI and integration tests.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::api::types::{AckReply, ErrorReply, ProcessReply, StatusReply};
use crate::error::Result;
use crate::model::{ResultDelivery, Submission};

/// Either the endpoint's success body or its error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Ok(T),
    Err { code: StatusCode, message: String },
}

impl<T> Reply<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Reply::Ok(body) => Some(body),
            Reply::Err { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize(base_url.into()),
        }
    }

    /// Like [`RelayClient::new`] with a client-side request timeout. It should
    /// exceed the server's wait timeout or `submit` gives up first.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: normalize(base_url.into()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /api/process`. Blocks until the relay answers.
    pub async fn submit(&self, submission: &Submission) -> Result<Reply<ProcessReply>> {
        let response = self
            .http
            .post(self.url("/api/process"))
            .json(submission)
            .send()
            .await?;
        decode(response).await
    }

    /// `POST /api/result`
    pub async fn deliver(&self, delivery: &ResultDelivery) -> Result<Reply<AckReply>> {
        let response = self
            .http
            .post(self.url("/api/result"))
            .json(delivery)
            .send()
            .await?;
        decode(response).await
    }

    /// `GET /api/status`
    pub async fn status(&self) -> Result<StatusReply> {
        let response = self
            .http
            .get(self.url("/api/status"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<Reply<T>> {
    let code = response.status();
    if code.is_success() {
        return Ok(Reply::Ok(response.json().await?));
    }

    let text = response.text().await?;
    let message = serde_json::from_str::<ErrorReply>(&text)
        .map(|reply| reply.message)
        .unwrap_or(text);
    Ok(Reply::Err { code, message })
}
