//! Worker push channel over a websocket.
//!
//! Each connected socket gets every `new_request` event dispatched while it
//! is attached, and may send results back as `result` frames.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::ApiState;
use crate::engine::Relay;
use crate::event::{WorkerEvent, WorkerMessage};
use crate::telemetry::metrics;

/// `GET /ws`
pub async fn connect(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    let socket_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| {
        run_socket(socket, state.relay).instrument(info_span!("worker", %socket_id))
    })
}

async fn run_socket(mut socket: WebSocket, relay: Relay) {
    // Subscribe before greeting so nothing dispatched in between is missed
    let mut events = relay.subscribe();
    info!("worker connected");
    metrics::workers_connected().add(1, &[]);

    if send_event(&mut socket, &WorkerEvent::connected()).await {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "worker socket lagging, requests dropped for it");
                    }
                    Err(RecvError::Closed) => break,
                },
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => handle_message(&relay, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("worker socket error: {e}");
                        break;
                    }
                },
            }
        }
    }

    metrics::workers_connected().add(-1, &[]);
    info!("worker disconnected");
}

/// Returns false once the socket can no longer be written to.
async fn send_event(socket: &mut WebSocket, event: &WorkerEvent) -> bool {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(event = event.name(), "failed to encode worker event: {e}");
            return true;
        }
    };
    match socket.send(Message::Text(frame.into())).await {
        Ok(()) => true,
        Err(e) => {
            debug!(event = event.name(), "worker send failed: {e}");
            false
        }
    }
}

fn handle_message(relay: &Relay, text: &str) {
    match serde_json::from_str::<WorkerMessage>(text) {
        Ok(WorkerMessage::Result(delivery)) => {
            if let Err(e) = relay.deliver(delivery) {
                warn!("rejected result from worker socket: {e}");
            }
        }
        Ok(WorkerMessage::Unknown) => debug!("ignoring unrecognized worker event"),
        Err(e) => warn!("malformed worker frame: {e}"),
    }
}
