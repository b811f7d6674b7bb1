//! Host shutdown signals
//!
//! On Unix the supervisor stops on SIGINT, SIGTERM or SIGQUIT, with
//! [`tokio::signal::ctrl_c`] awaited as well. Elsewhere only Ctrl-C is
//! awaited.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancel `token` when the host is asked to shut down
pub fn cancel_on_shutdown(token: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                warn!("failed to listen for shutdown signals: {}", e);
                return;
            }
        }
        token.cancel();
    });
}
