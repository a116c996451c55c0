//! Process termination signals.
//!
//! **Unix:** `SIGINT` (Ctrl-C) and `SIGTERM` (default `kill`, used by
//! container runtimes). **Elsewhere:** Ctrl-C only.

/// Wait for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if a handler
/// cannot be registered.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

/// Wait for a termination signal.
///
/// Returns `Ok(())` when Ctrl-C is received, or `Err` if the handler
/// cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
