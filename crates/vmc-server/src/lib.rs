//! HTTP and `WebSocket` surface of the mock vending-machine controller.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** to request a vend (`POST /vend`), poll progress
//!   (`GET /status`) and probe liveness (`GET /health`)
//! - **`WebSocket` endpoint** (`/` and `/ws`) pushing a status snapshot on
//!   connect, then every `status` and `vend-complete` notification
//!
//! # Architecture
//!
//! All behaviour lives in [`vmc_core::machine::VendMachine`]. This crate
//! only maps its outcomes to status codes and JSON bodies, and bridges
//! hub subscriptions onto `WebSocket` connections.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, bind, serve};
pub use state::AppState;
