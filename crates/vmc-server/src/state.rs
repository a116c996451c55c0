//! Shared application state for the controller's HTTP server.
//!
//! [`AppState`] holds the [`VendMachine`] handle. The machine itself owns
//! the notification hub, so the REST handlers and the push channel reach
//! the same state through one clone-cheap value.

use std::sync::Arc;

use vmc_core::config::VmcConfig;
use vmc_core::hub::NotificationHub;
use vmc_core::machine::VendMachine;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The single-flight vend state machine.
    pub machine: VendMachine,
}

impl AppState {
    /// Create application state around an existing machine.
    pub const fn new(machine: VendMachine) -> Self {
        Self { machine }
    }

    /// Build a fresh idle machine and hub from configuration.
    pub fn from_config(config: &VmcConfig) -> Self {
        let hub = Arc::new(NotificationHub::new(
            config.notifications.subscriber_buffer,
        ));
        Self::new(VendMachine::new(hub, config.vending.delay()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&VmcConfig::default())
    }
}
