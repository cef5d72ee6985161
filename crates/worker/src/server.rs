//! Worker RPC server
//!
//! Hosts `Worker.Compute` on one listener. A worker process runs one of these
//! per configured endpoint.

use crate::compute;
use matrixpool_common::{PoolError, Result, RpcServer};
use matrixpool_proto::{methods, Operation, OperationResult};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Worker RPC server
pub struct WorkerServer {
    address: String,
}

impl WorkerServer {
    /// Create a new worker server for `address` (host:port)
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|e| PoolError::connection(format!("Worker failed to bind {}: {}", self.address, e)))?;

        serve(listener, shutdown).await?;
        info!("Worker {} shut down", self.address);
        Ok(())
    }
}

/// Build the RPC table for a worker
pub fn rpc_server(name: impl Into<String>) -> RpcServer {
    let mut server = RpcServer::new(name);
    server.register(methods::COMPUTE, |op: Operation| async move {
        tokio::task::spawn_blocking(move || compute::execute(&op))
            .await
            .unwrap_or_else(|_| OperationResult::failure("Worker computation failed"))
    });
    server
}

/// Serve `Worker.Compute` on an already-bound listener
pub async fn serve<S>(listener: TcpListener, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send,
{
    let name = format!("worker {}", listener.local_addr()?);
    rpc_server(name).serve(listener, shutdown).await
}
