//! Ctrl-C handling for the console
//!
//! The first interrupt asks the session to stop before the next turn. A second
//! one means the user does not want to wait for the in-flight reply.

use std::future::Future;
use std::io;

use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for interrupts, cancelling `cancel` on the first
///
/// Returns `true` when a second interrupt arrives and the process should exit
/// right away, `false` when the signal source fails.
pub async fn watch_interrupts<F, Fut>(mut next_signal: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        warn!(error = %e, "cannot listen for interrupts");
        return false;
    }
    info!("interrupt received, stopping after the current turn");
    eprintln!(
        "\n{}",
        "Stopping after the current turn... (Ctrl-C again to quit now)".yellow()
    );
    cancel.cancel();

    match next_signal().await {
        Ok(()) => {
            info!("second interrupt received, exiting");
            true
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for interrupts");
            false
        }
    }
}
