//! Request handlers for the JSON endpoints.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use super::ApiState;
use super::types::{
    AckReply, ErrorReply, PROMPT_REQUIRED, ProcessReply, REQUEST_TIMEOUT, RESULT_FIELDS_REQUIRED,
    StatusReply,
};
use crate::error::Error;
use crate::model::{ResultDelivery, Submission};

fn reject(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ErrorReply::new(message))).into_response()
}

fn invalid_body(rejection: JsonRejection) -> Response {
    warn!(%rejection, "rejected request body");
    reject(StatusCode::BAD_REQUEST, rejection.body_text())
}

/// `POST /api/process`: dispatch and hold the connection until the answer
/// arrives or the wait times out.
pub async fn process(
    State(state): State<ApiState>,
    body: Result<Json<Submission>, JsonRejection>,
) -> Response {
    let Json(submission) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.relay.submit(submission).await {
        Ok(answer) => (StatusCode::OK, Json(ProcessReply::from(answer))).into_response(),
        Err(Error::MissingField(_)) => reject(StatusCode::BAD_REQUEST, PROMPT_REQUIRED),
        Err(Error::Timeout { .. }) => reject(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT),
        Err(e) => {
            error!("process failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `POST /api/result`: the worker hands back a result. Unknown ids are
/// still acknowledged; the collector logs them.
pub async fn receive_result(
    State(state): State<ApiState>,
    body: Result<Json<ResultDelivery>, JsonRejection>,
) -> Response {
    let Json(delivery) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.relay.deliver(delivery) {
        Ok(_) => (StatusCode::OK, Json(AckReply::stored())).into_response(),
        Err(e) if e.is_client_error() => {
            reject(StatusCode::BAD_REQUEST, RESULT_FIELDS_REQUIRED)
        }
        Err(e) => {
            error!("result delivery failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `GET /api/status`
pub async fn status(State(state): State<ApiState>) -> Json<StatusReply> {
    Json(StatusReply::online(
        state.relay.status(),
        state.relay.workers(),
    ))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "up" }))
}
