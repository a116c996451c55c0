//! Axum router construction for the controller API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so a browser-based ordering app served
//! from another origin can call it.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the controller.
///
/// The router includes:
/// - `POST /vend` -- start a vend
/// - `GET /status` -- current machine status
/// - `GET /health` -- liveness probe
/// - `GET /` and `GET /ws` -- `WebSocket` push channel
///
/// CORS allows any origin, method and header.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // REST API
        .route("/vend", post(handlers::vend))
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/", get(ws::ws_notifications))
        .route("/ws", get(ws::ws_notifications))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
