//! `WebSocket` push channel for machine notifications.
//!
//! Clients connect to `GET /` (or `GET /ws`) and immediately receive a
//! `status` frame with the current phase and items, followed by every
//! `status` and `vend-complete` frame the machine emits while they stay
//! connected. The channel is server-push only: text and binary frames
//! from the client are ignored.
//!
//! The connection ends when the client closes, a send fails, or the hub
//! detaches the subscriber at shutdown.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming machine notifications.
///
/// # Route
///
/// `GET /`, `GET /ws`
pub async fn ws_notifications(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: attach to the hub, forward each
/// notification as a text frame, detach on the way out.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.machine.subscribe().await;
    let id = subscription.id();
    debug!(subscriber = %id, "WebSocket client connected");

    loop {
        tokio::select! {
            // Receive a notification from the machine.
            frame = subscription.recv() => {
                let Some(notification) = frame else {
                    debug!(subscriber = %id, "subscriber detached, closing WebSocket");
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let json = match serde_json::to_string(&notification) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("Failed to serialize notification: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(subscriber = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(subscriber = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(subscriber = %id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }

    state.machine.hub().detach(id).await;
}
