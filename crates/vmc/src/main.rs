//! Mock vending-machine controller binary.
//!
//! Serves the controller API so an ordering application can be built
//! and tested without vending hardware. It loads configuration, builds
//! the vend state machine and its notification hub, and serves HTTP and
//! `WebSocket` traffic until a termination signal arrives.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `vmc-config.yaml` (or `VMC_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the notification hub and vend state machine
//! 4. Bind the HTTP listener
//! 5. Serve until `SIGINT`/`SIGTERM`
//!
//! # Shutdown Sequence
//!
//! 1. Close the machine: cancel any pending vend completion (no
//!    `vend-complete` is sent) and refuse further vends with `503`
//! 2. Close the hub so every push connection, including ones opened
//!    while draining, gets a close frame
//! 3. Drain in-flight HTTP requests and release the listener

mod error;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vmc_core::config::VmcConfig;
use vmc_server::state::AppState;

use crate::error::ControllerError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "vmc-config.yaml";

/// Application entry point for the controller.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the listener cannot be
/// bound, or the server fails while serving.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        host = config.server.host,
        port = config.server.port,
        delay_ms = config.vending.delay_ms,
        subscriber_buffer = config.notifications.subscriber_buffer,
        "Configuration loaded"
    );

    // 3. Build the state machine and hub.
    let state = Arc::new(AppState::from_config(&config));

    // 4. Bind the listener.
    let listener = vmc_server::bind(&config.server)
        .await
        .map_err(ControllerError::from)?;
    info!("Endpoints: POST /vend, GET /status, GET /health, WS / and /ws");

    // 5. Serve until a termination signal.
    let shutdown = {
        let state = Arc::clone(&state);
        async move {
            if let Err(e) = shutdown::wait_for_shutdown_signal().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("Shutting down VMC mock server");

            if let Some(items) = state.machine.shutdown().await {
                warn!(?items, "abandoned in-progress vend");
            }
        }
    };

    vmc_server::serve(listener, state, shutdown)
        .await
        .map_err(ControllerError::from)?;

    info!("vmc-mock-server shutdown complete");
    Ok(())
}

/// Load configuration from `VMC_CONFIG` or `vmc-config.yaml`, falling
/// back to defaults plus environment overrides when no file exists.
fn load_config() -> Result<VmcConfig, ControllerError> {
    let explicit = std::env::var_os("VMC_CONFIG").map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    // An explicitly named file must exist; the default one is optional.
    if explicit.is_some() || path.exists() {
        Ok(VmcConfig::from_file(&path)?)
    } else {
        Ok(VmcConfig::from_env()?)
    }
}
