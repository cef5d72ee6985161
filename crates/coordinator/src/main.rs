//! MatrixPool Coordinator - Main Entry Point
//!
//! Accepts client requests and dispatches them to the static worker pool.
//! Stops on `Coordinator.Shutdown` or Ctrl-C.

use matrixpool_common::{PoolConfig, PoolError, Result, METRICS};
use matrixpool_coordinator::{CoordinatorServer, Dispatcher, WorkerRegistry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = PoolConfig::from_env_or(PoolConfig::default_coordinator)?;

    // Initialize logging
    let level = config.log_level();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("matrixpool_coordinator={level},matrixpool_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    METRICS.set_enabled(config.metrics_enabled());

    info!("Coordinator starting...");

    // Get coordinator-specific config
    let coordinator_config = config.coordinator.as_ref()
        .ok_or_else(|| PoolError::config("Coordinator config not found"))?;

    for endpoint in &coordinator_config.worker_endpoints {
        info!("Registered worker: {}", endpoint);
    }

    let registry = WorkerRegistry::new(coordinator_config.worker_endpoints.iter().cloned());
    let dispatcher = Arc::new(Dispatcher::with_tcp(registry));

    let listen_address = config.listen_address();
    let listener = TcpListener::bind(&listen_address)
        .await
        .map_err(|e| PoolError::connection(format!("Error starting coordinator on {}: {}", listen_address, e)))?;

    info!("Coordinator is running on {}", listen_address);

    CoordinatorServer::new(dispatcher)
        .serve_until(listener, async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("MatrixPool Coordinator shutdown complete");
    Ok(())
}
