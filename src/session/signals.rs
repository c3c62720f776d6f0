//! Termination signals.
//!
//! Raw mode turns Ctrl-C into input for the remote side, so the only signals
//! left to handle are external ones. Catching them routes an external kill
//! through normal teardown, which restores the terminal.

use super::completion::StopReason;
use crate::error::TunnelError;

/// Resolves when `SIGTERM` or `SIGHUP` arrives.
#[cfg(unix)]
pub async fn pump_shutdown_signals() -> Result<StopReason, TunnelError> {
    use signal_hook::consts::signal::{SIGHUP, SIGTERM};
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::from_raw(SIGTERM))?;
    let mut hup = signal(SignalKind::from_raw(SIGHUP))?;

    tokio::select! {
        _ = term.recv() => Ok(StopReason::Signal("SIGTERM")),
        _ = hup.recv() => Ok(StopReason::Signal("SIGHUP")),
    }
}

/// No termination signals to watch on this platform.
#[cfg(not(unix))]
pub async fn pump_shutdown_signals() -> Result<StopReason, TunnelError> {
    std::future::pending().await
}
