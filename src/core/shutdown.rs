//! # OS termination signals.
//!
//! [`shutdown_signal`] completes when the process is asked to stop:
//! `SIGINT`, `SIGTERM` or `SIGQUIT` on unix, Ctrl-C elsewhere.
//! Used by [`Supervisor::run_until_signal`](crate::Supervisor::run_until_signal).

use crate::error::RuntimeError;

fn signal_error(err: std::io::Error) -> RuntimeError {
    RuntimeError::Signal {
        error: err.to_string(),
    }
}

/// Waits for a termination signal. Each call registers its own listeners.
#[cfg(unix)]
pub async fn shutdown_signal() -> Result<(), RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt()).map_err(signal_error)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(signal_error)?;
    let mut quit = signal(SignalKind::quit()).map_err(signal_error)?;

    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal. Each call registers its own listeners.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> Result<(), RuntimeError> {
    tokio::signal::ctrl_c().await.map_err(signal_error)
}
