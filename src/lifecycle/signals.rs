//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT, SIGTERM and SIGQUIT (Ctrl+C elsewhere)
//! - Translate the first signal into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered eagerly so a registration failure is a startup
//!   error, not a silent gap
//! - Every signal means immediate shutdown; there is no reload signal

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Register signal handlers and spawn the task that waits on them.
///
/// The returned handle is owned by the caller; aborting it uninstalls the
/// listener for this process instance only.
#[cfg(unix)]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tracing::debug!("Signal handlers installed (SIGINT, SIGTERM, SIGQUIT)");

    Ok(tokio::spawn(async move {
        let reason = tokio::select! {
            _ = sigint.recv() => ShutdownReason::Interrupt,
            _ = sigterm.recv() => ShutdownReason::Terminate,
            _ = sigquit.recv() => ShutdownReason::Quit,
        };
        tracing::info!(signal = %reason, "Received termination signal");
        shutdown.trigger(reason);
    }))
}

#[cfg(not(unix))]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    tracing::debug!("Ctrl+C handler installed");

    Ok(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!(signal = %ShutdownReason::Interrupt, "Received termination signal");
                shutdown.trigger(ShutdownReason::Interrupt);
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    }))
}
