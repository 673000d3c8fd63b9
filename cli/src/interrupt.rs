//! Operator interrupts.
//!
//! The first SIGINT/SIGTERM becomes a stop request, honoured once the
//! current recipient is finished (or immediately during the countdown).
//! A second one exits without waiting.

use tokio::signal;
use tracing::{info, warn};
use vestdrop_engine::StopSignal;

/// Exit status used when the operator forces an exit.
const FORCED_EXIT_CODE: i32 = 130;

/// Wait for SIGINT or SIGTERM. Returns `false` if no handler could be installed.
async fn wait_for_signal() -> bool {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => {
                info!("received SIGINT");
                true
            }
            Err(e) => {
                warn!("failed to install SIGINT handler: {e}");
                false
            }
        },
        _ = terminate => {
            info!("received SIGTERM");
            true
        }
    }
}

/// Translate operator interrupts into stop requests on `stop`.
pub fn spawn_listener(stop: StopSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !wait_for_signal().await {
            return;
        }
        stop.request_stop();
        eprintln!("\nStop requested: finishing the current recipient. Interrupt again to exit now.");

        if wait_for_signal().await {
            warn!("second interrupt, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
