//! Signal handling for watch mode.
//!
//! - SIGTERM/SIGINT: stop watching
//! - SIGHUP: refresh the feed now
//!
//! Other platforms only get Ctrl+C.

use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tracing::{debug, info};

use crate::error::ServerResult;

/// Listens for process signals and exposes them as channels.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    refresh: Arc<Notify>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Installs the handlers and spawns the listener task.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be installed.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        let shutdown_tx = self.shutdown_tx.clone();
        let refresh = self.refresh.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, stopping");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, stopping");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, refreshing");
                        refresh.notify_one();
                    }
                }
            }

            debug!("Signal listener stopped");
        });

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, stopping");
                let _ = shutdown_tx.send(true);
            }
        });

        Ok(())
    }

    /// Returns a future that completes when shutdown is signaled.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Waits for the next refresh request.
    pub async fn refresh_requested(&self) {
        self.refresh.notified().await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Programmatically requests a refresh.
    pub fn trigger_refresh(&self) {
        self.refresh.notify_one();
    }
}

/// A signal that completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // A closed channel also ends the wait.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
