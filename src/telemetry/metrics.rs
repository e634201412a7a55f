//! Metric instrument factories for prompt-relay.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"prompt-relay"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

/// Returns the shared meter for prompt-relay instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("prompt-relay")
}

/// Counter: requests published to the worker channel.
/// Labels: `model`, `delivered` ("true" if any worker was subscribed).
pub fn requests_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("relay.requests.dispatched")
        .with_description("Number of requests published to the worker channel")
        .build()
}

/// Counter: requests answered before their deadline.
/// Labels: `model`.
pub fn requests_completed() -> Counter<u64> {
    meter()
        .u64_counter("relay.requests.completed")
        .with_description("Number of requests answered by the worker")
        .build()
}

/// Counter: requests that hit their deadline.
/// Labels: `model`.
pub fn requests_timed_out() -> Counter<u64> {
    meter()
        .u64_counter("relay.requests.timed_out")
        .with_description("Number of requests that timed out waiting for a result")
        .build()
}

/// Counter: results delivered by workers.
/// Labels: `outcome` ("accepted" | "unknown").
pub fn results_received() -> Counter<u64> {
    meter()
        .u64_counter("relay.results.received")
        .with_description("Number of results delivered by workers")
        .build()
}

/// Counter: store entries removed by the abandoned-entry sweep.
pub fn entries_swept() -> Counter<u64> {
    meter()
        .u64_counter("relay.store.swept")
        .with_description("Number of abandoned store entries removed by the sweeper")
        .build()
}

/// Up/down counter: currently connected worker sockets.
pub fn workers_connected() -> UpDownCounter<i64> {
    meter()
        .i64_up_down_counter("relay.workers.connected")
        .with_description("Number of connected worker sockets")
        .build()
}

/// Histogram: time a caller spent waiting for its result, in milliseconds.
/// Labels: `outcome` ("completed" | "timeout").
pub fn wait_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("relay.wait.duration_ms")
        .with_description("Time spent waiting for a worker result")
        .with_unit("ms")
        .build()
}
