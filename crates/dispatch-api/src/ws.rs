//! `WebSocket` handler for the fleet change stream.
//!
//! Clients connect to `GET /ws/fleet` and become observers of the
//! [`ChangeBus`](dispatch_core::ChangeBus). The first message is always a
//! full snapshot (`{"type": "ambulance_update", "data": [...]}`); every
//! later message is one JSON-encoded
//! [`ChangeEvent`](dispatch_types::ChangeEvent) per push.
//!
//! A client that falls behind the broadcast buffer is handed a fresh
//! full snapshot by its subscription and continues from the live tail.
//! A dead client only ever affects its own connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming fleet changes.
///
/// # Route
///
/// `GET /ws/fleet`
pub async fn ws_fleet(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe to the bus and forward
/// each change event as a text frame.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.subscribe().await;
    let observer = subscription.id();
    debug!(observer, "fleet observer connected");

    loop {
        tokio::select! {
            // Next change from the bus.
            event = subscription.recv() => {
                let Some(event) = event else {
                    debug!(observer, "change bus closed, shutting down WebSocket");
                    break;
                };
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!(observer, kind = event.kind(), "failed to serialize change event: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(observer, "fleet observer disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(observer, "fleet observer disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(observer, "fleet observer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(observer, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // The stream is push-only; client frames are ignored.
                    }
                }
            }
        }
    }

    state.store.bus().unsubscribe(subscription);
}
