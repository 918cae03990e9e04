//! Shutdown signal wiring.
//!
//! The poll loop never blocks on a signal. A background task listens for
//! SIGINT/SIGTERM (Ctrl+C elsewhere) and sets a shared flag, which the loop
//! samples between ticks.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

/// Spawn the listener on the current tokio runtime and return the flag it
/// sets. Must be called from within a runtime.
pub fn spawn_shutdown_listener() -> Arc<AtomicBool> {
    spawn_flag_on(async {
        wait_for_signal().await;
        debug!("shutdown signal received");
    })
}

/// Return a flag that a background task sets once `trigger` completes.
fn spawn_flag_on<F>(trigger: F) -> Arc<AtomicBool>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        trigger.await;
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    shutdown
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(int), Ok(term)) => (int, term),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "could not install signal handlers");
                return std::future::pending().await;
            }
        };

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
