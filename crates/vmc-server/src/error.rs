//! Error types for the controller's HTTP API.
//!
//! [`ApiError`] turns admission failures into the JSON bodies the
//! ordering application expects, via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vmc_core::error::{BUSY_MESSAGE, INVALID_ITEMS_MESSAGE, VendError};
use vmc_types::VendRejected;

/// Errors that can occur in the controller API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The state machine refused the request.
    #[error(transparent)]
    Vend(#[from] VendError),

    /// The request body was not a JSON object with an `items` array.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    /// HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Vend(VendError::Busy { .. }) => StatusCode::CONFLICT,
            Self::Vend(VendError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Vend(VendError::InvalidRequest { .. }) | Self::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Vend(VendError::Busy { current_items }) => VendRejected {
                success: false,
                message: BUSY_MESSAGE.to_owned(),
                current_items: Some(current_items),
            },
            Self::Vend(err @ (VendError::InvalidRequest { .. } | VendError::Closed)) => VendRejected {
                success: false,
                message: err.to_string(),
                current_items: None,
            },
            Self::InvalidBody(_) => VendRejected {
                success: false,
                message: INVALID_ITEMS_MESSAGE.to_owned(),
                current_items: None,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
