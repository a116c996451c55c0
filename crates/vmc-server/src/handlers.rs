//! REST endpoint handlers for the controller.
//!
//! The handlers translate between HTTP and the [`VendMachine`]; they hold
//! no state and make no decisions of their own.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/vend` | Start vending a list of items |
//! | `GET` | `/status` | Current phase, items and elapsed time |
//! | `GET` | `/health` | Liveness probe |
//!
//! [`VendMachine`]: vmc_core::machine::VendMachine

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{debug, info};
use vmc_types::{HealthReport, StatusReport, VendAccepted, VendRequest};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /vend
// ---------------------------------------------------------------------------

/// Ask the machine to vend the items in the request body.
///
/// Responds `202 Accepted` as soon as vending has started; completion is
/// observed by polling `/status` or over the push channel.
///
/// # Errors
///
/// - `400` if the body is not JSON with a non-empty `items` array.
/// - `409` if a vend is already in progress.
/// - `503` once the machine has been shut down.
pub async fn vend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VendAccepted>), ApiError> {
    let Json(request) = payload.inspect_err(|rejection| {
        debug!(error = %rejection, "vend request body rejected");
    })?;

    match state.machine.request_vend(request.items).await {
        Ok(accepted) => Ok((StatusCode::ACCEPTED, Json(accepted))),
        Err(err) => {
            info!(error = %err, current = ?err.current_items(), "vend request refused");
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

/// Report the machine's phase, and while vending, its items and the
/// milliseconds elapsed since the vend started.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    Json(state.machine.status().await)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe. Does not consult the machine.
pub async fn health() -> Json<HealthReport> {
    Json(HealthReport::healthy(Utc::now()))
}
