//! Vend state machine and notification fan-out for the mock
//! vending-machine controller.
//!
//! This crate owns the only stateful part of the controller: exactly one
//! vend may be in flight, it completes asynchronously after a fixed
//! delay, and every transition is pushed to all attached observers.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `vmc-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`VendError`], the admission rejections.
//! - [`hub`] -- [`NotificationHub`], best-effort fan-out to subscribers.
//! - [`machine`] -- [`VendMachine`], the single-flight state machine.
//!
//! [`VendError`]: error::VendError
//! [`NotificationHub`]: hub::NotificationHub
//! [`VendMachine`]: machine::VendMachine

pub mod config;
pub mod error;
pub mod hub;
pub mod machine;

pub use config::{ConfigError, VmcConfig};
pub use error::VendError;
pub use hub::{NotificationHub, Subscription};
pub use machine::VendMachine;
