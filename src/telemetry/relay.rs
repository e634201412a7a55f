//! Request span helpers.
//!
//! Provides span creation and state-transition recording for requests
//! flowing through the relay.

use tracing::Span;

use crate::model::RequestId;

/// Start a span covering one request from dispatch to handoff.
///
/// The id does not exist until the store entry is created inside the span,
/// so `relay.request_id` starts empty and is filled in by
/// [`record_request_id`]; `relay.outcome` by [`record_outcome`].
pub fn start_request_span(model: &str) -> Span {
    tracing::info_span!(
        "relay.request",
        "relay.request_id" = tracing::field::Empty,
        "gen_ai.request.model" = model,
        "relay.outcome" = tracing::field::Empty,
    )
}

pub fn record_request_id(span: &Span, request_id: &RequestId) {
    span.record("relay.request_id", tracing::field::display(request_id));
}

/// Record a state transition event on the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}

/// Record how the request ended ("completed" | "timeout").
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("relay.outcome", outcome);
}

/// Shorten `text` to at most `max` characters for log previews.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
