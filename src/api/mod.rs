//! HTTP surface and worker socket.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/process` | submit a prompt and wait for the worker's answer |
//! | `POST /api/result` | worker delivers a result |
//! | `GET /api/status` | store occupancy |
//! | `GET /ws` | worker push channel (websocket) |
//! | `GET /health` | liveness |

pub mod handlers;
pub mod types;
pub mod worker;

use std::future::Future;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::Relay;
use crate::error::Result;

#[derive(Clone)]
pub struct ApiState {
    pub(crate) relay: Relay,
}

impl ApiState {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

/// The worker page is served from another origin, so every route answers
/// CORS preflights from any origin.
pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/api/process", post(handlers::process))
        .route("/api/result", post(handlers::receive_result))
        .route("/api/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .route("/ws", get(worker::connect))
        .with_state(ApiState::new(relay))
        .layer(CorsLayer::permissive())
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, relay: Relay, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = ?listener.local_addr().ok(), "relay listening");
    axum::serve(listener, router(relay))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("API server stopped gracefully");
    Ok(())
}
