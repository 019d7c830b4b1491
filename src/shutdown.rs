//! OS signal handling.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `token` on the first SIGINT or SIGTERM.
pub(crate) fn install(token: CancellationToken) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
            token.cancel();
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
        }
        token.cancel();
    });

    info!("Signal handlers installed");
    Ok(())
}
