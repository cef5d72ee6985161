//! MatrixPool Worker - Main Entry Point
//!
//! Starts one listener per configured worker endpoint. All listeners share a
//! local shutdown signal fired by Ctrl-C; the coordinator never stops workers.

use matrixpool_common::{PoolConfig, PoolError, Result, METRICS};
use matrixpool_worker::WorkerServer;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = PoolConfig::from_env_or(PoolConfig::default_worker)?;

    // Initialize logging
    let level = config.log_level();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("matrixpool_worker={level},matrixpool_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    METRICS.set_enabled(config.metrics_enabled());

    info!("Starting MatrixPool Worker");

    let worker_config = config.worker.as_ref()
        .ok_or_else(|| PoolError::config("Worker config not found"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = JoinSet::new();

    for endpoint in &worker_config.endpoints {
        let mut stop = shutdown_rx.clone();
        info!("Starting worker on {}", endpoint);
        servers.spawn(WorkerServer::new(endpoint.clone()).run(async move {
            let _ = stop.wait_for(|stopped| *stopped).await;
        }));
    }

    // Wait for shutdown signal, or for a listener to die on its own
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        Some(result) = servers.join_next() => {
            let _ = shutdown_tx.send(true);
            flatten(result)?;
        }
    }

    let _ = shutdown_tx.send(true);
    while let Some(result) = servers.join_next().await {
        if let Err(e) = flatten(result) {
            error!("Worker listener failed: {}", e);
        }
    }

    info!("MatrixPool Worker shutdown complete");
    Ok(())
}

fn flatten(result: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    result.map_err(|e| PoolError::Internal(format!("Worker task panicked: {}", e)))?
}
