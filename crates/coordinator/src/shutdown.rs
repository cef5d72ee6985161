//! Coordinator shutdown
//!
//! `trigger` fires a one-shot signal. A background task consumes it, makes a
//! drive-by connection to every registered worker (connect, then close without
//! sending anything) and then releases the coordinator listener. Workers are
//! not told to stop; they shut down on their own local signal. In-flight
//! dispatches are neither awaited nor cancelled.

use crate::dispatcher::Dispatcher;
use matrixpool_common::METRICS;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Fixed reply to the administrative shutdown call
pub const SHUTDOWN_ACK: &str = "Coordinator shutting down.";

/// Handle for the administrative shutdown entry point
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    trigger: mpsc::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Spawn the shutdown task
    ///
    /// `stop_listener` is fired once every worker has been visited.
    pub fn spawn(dispatcher: Arc<Dispatcher>, stop_listener: oneshot::Sender<()>) -> Self {
        let (trigger, signal) = mpsc::channel(1);
        tokio::spawn(run(signal, dispatcher, stop_listener));
        Self {
            trigger,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fire the shutdown signal; the payload is ignored
    ///
    /// Later calls are no-ops and never block.
    pub fn trigger(&self, _payload: String) -> String {
        if self.request() {
            info!("Coordinator shutdown requested");
        } else {
            debug!("Coordinator shutdown already in progress");
        }
        SHUTDOWN_ACK.to_string()
    }

    /// Send the signal on the first call only; returns whether this call sent it
    fn request(&self) -> bool {
        if self.requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.trigger.try_send(());
        true
    }
}

async fn run(mut signal: mpsc::Receiver<()>, dispatcher: Arc<Dispatcher>, stop_listener: oneshot::Sender<()>) {
    if signal.recv().await.is_none() {
        return;
    }

    let reached = notify_workers(&dispatcher.worker_addresses()).await;
    info!("Notified {} worker(s) of coordinator shutdown", reached);
    if let Some(snapshot) = METRICS.snapshot() {
        debug!("Final metrics:\n{}", snapshot);
    }

    info!("Coordinator shutdown complete.");
    let _ = stop_listener.send(());
}

/// Open and immediately close a connection to each address
///
/// Returns how many workers accepted the connection. Unreachable workers are
/// logged and skipped.
pub async fn notify_workers(addresses: &[String]) -> usize {
    let mut reached = 0;

    for address in addresses {
        match TcpStream::connect(address).await {
            Ok(stream) => {
                drop(stream);
                reached += 1;
            }
            Err(e) => {
                warn!("Error connecting to worker {}: {}", address, e);
            }
        }
    }

    reached
}
