//! Cooperative shutdown.
//!
//! Signals never kill the services mid-task. A [`ShutdownController`] turns
//! SIGINT, SIGTERM and SIGQUIT into a cancellation that every service loop
//! observes at its next iteration boundary, and remembers which signal fired
//! so the process can exit with the conventional `128 + signum` code.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::info;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::config::SIGNAL_EXIT_CODE_OFFSET;

/// Shared stop flag plus the exit code the process should finish with.
#[derive(Debug, Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    exit_code: Arc<AtomicI32>,
}

impl ShutdownController {
    /// A controller in the running state with exit code 0.
    pub fn new() -> Self {
        ShutdownController::default()
    }

    /// Requests shutdown on behalf of `signum` and records the exit code.
    ///
    /// Only the first trigger decides the exit code; later signals are
    /// ignored.
    pub fn trigger(&self, signum: i32) {
        if !self.token.is_cancelled() {
            self.exit_code
                .store(SIGNAL_EXIT_CODE_OFFSET + signum, Ordering::SeqCst);
            self.token.cancel();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The code the process should exit with: 0 while running, `128 + signum`
    /// after a signal-triggered shutdown.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }
}

/// Installs handlers that route SIGINT, SIGTERM and SIGQUIT into the
/// controller.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be registered.
pub fn install_signal_handlers(shutdown: &ShutdownController) -> std::io::Result<()> {
    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::quit(), "SIGQUIT"),
    ] {
        let signum = kind.as_raw_value();
        let mut stream = signal(kind)?;
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if stream.recv().await.is_some() {
                info!("received {name}, shutting down");
                shutdown.trigger(signum);
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_starts_running_with_exit_code_zero() {
        let shutdown = ShutdownController::new();
        assert!(!shutdown.is_cancelled());
        assert_eq!(shutdown.exit_code(), 0);
    }

    #[test]
    fn test_trigger_records_offset_exit_code() {
        let shutdown = ShutdownController::new();
        shutdown.trigger(15);
        assert!(shutdown.is_cancelled());
        assert_eq!(shutdown.exit_code(), 143);
    }

    #[test]
    fn test_first_signal_wins() {
        let shutdown = ShutdownController::new();
        shutdown.trigger(2);
        shutdown.trigger(15);
        assert_eq!(shutdown.exit_code(), 130);
    }

    #[test]
    fn test_clones_share_state() {
        let shutdown = ShutdownController::new();
        let other = shutdown.clone();
        shutdown.trigger(3);
        assert!(other.is_cancelled());
        assert_eq!(other.exit_code(), 131);
    }

    #[tokio::test]
    async fn test_cancelled_future_completes_after_trigger() {
        let shutdown = ShutdownController::new();
        shutdown.trigger(15);
        shutdown.cancelled().await;
    }
}
