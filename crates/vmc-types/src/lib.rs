//! Shared wire types for the mock vending-machine controller.
//!
//! Every JSON shape the controller emits or accepts lives here so the
//! HTTP layer, the push channel and the state machine agree on one
//! definition. Types flow downstream to `TypeScript` via `ts-rs` for the
//! ordering frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Subscriber and item identifiers
//! - [`enums`] -- The machine [`Phase`]
//! - [`messages`] -- Push frames and HTTP request/response bodies

pub mod enums;
pub mod ids;
pub mod messages;

// Re-export all public types at crate root for convenience.
pub use enums::Phase;
pub use ids::{ItemId, SubscriberId};
pub use messages::{
    HealthReport, Notification, StatusReport, VendAccepted, VendRejected, VendRequest,
};
