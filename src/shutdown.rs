//! Cooperative interrupt handling.
//!
//! Workers check the flag before admitting new work and before each further
//! candidate request; requests already in flight are left to finish or time out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

/// Shared stop flag, cheap to clone into every worker.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this flag to stop taking new work.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Set the flag on Ctrl+C or SIGTERM. A second Ctrl+C exits immediately.
    pub fn install_signal_handler(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            if !flag.is_requested() {
                warn!("Interrupt received, finishing in-flight requests before stopping");
            }
            flag.request();

            if signal::ctrl_c().await.is_ok() {
                info!("Second interrupt received, exiting immediately");
                std::process::exit(130);
            }
        });
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = ShutdownFlag::new();
        let worker = flag.clone();
        assert!(!worker.is_requested());
        flag.request();
        assert!(worker.is_requested());
    }
}
