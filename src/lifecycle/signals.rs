//! OS signal handling.
//!
//! ctrl-c and SIGTERM trigger graceful shutdown; SIGHUP is translated
//! into a reload event for the configuration snapshot. Multiple shutdown
//! signals are idempotent — the broadcast fires once per trigger and the
//! server only acts on the first.

use tokio::sync::mpsc;

use crate::lifecycle::Shutdown;

/// Install signal handlers. Returns the receiver for reload events
/// (SIGHUP); the caller decides whether to honor them.
pub fn install(shutdown: &Shutdown) -> mpsc::UnboundedReceiver<()> {
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();

    let tx = shutdown.sender();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        tracing::info!("Shutdown signal received");
        let _ = tx.send(());
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let tx = shutdown.sender();
        tokio::spawn(async move {
            let mut term =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            term.recv().await;
            tracing::info!("SIGTERM received");
            let _ = tx.send(());
        });

        tokio::spawn(async move {
            let mut hup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
            while hup.recv().await.is_some() {
                tracing::info!("SIGHUP received, requesting config reload");
                if reload_tx.send(()).is_err() {
                    break;
                }
            }
        });
    }
    #[cfg(not(unix))]
    drop(reload_tx);

    reload_rx
}
