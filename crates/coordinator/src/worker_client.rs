//! Worker client for communication from coordinator to workers

use async_trait::async_trait;
use matrixpool_common::{rpc, Result};
use matrixpool_proto::{methods, Operation, OperationResult};
use tracing::debug;

/// Outbound call from the dispatcher to one worker
///
/// Implementations must report a failure to reach the worker as
/// `PoolError::Connection`, so the dispatcher can tell it apart from a call
/// that failed after connecting.
#[async_trait]
pub trait WorkerConnector: Send + Sync {
    async fn compute(&self, address: &str, op: &Operation) -> Result<OperationResult>;
}

/// Production connector: one TCP connection per call
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpWorkerConnector;

#[async_trait]
impl WorkerConnector for TcpWorkerConnector {
    async fn compute(&self, address: &str, op: &Operation) -> Result<OperationResult> {
        debug!("Forwarding {} to worker at {}", op.kind, address);
        rpc::call(address, methods::COMPUTE, op).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrixpool_common::PoolError;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_compute_against_worker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (_tx, rx) = oneshot::channel::<()>();
        tokio::spawn(matrixpool_worker::server::serve(listener, async move {
            let _ = rx.await;
        }));

        let result = TcpWorkerConnector
            .compute(&addr, &Operation::transpose(vec![vec![1, 2, 3], vec![4, 5, 6]]))
            .await
            .unwrap();
        assert_eq!(result.matrix, Some(vec![vec![1, 4], vec![2, 5], vec![3, 6]]));
    }

    #[tokio::test]
    async fn test_unreachable_worker_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpWorkerConnector
            .compute(&addr, &Operation::transpose(vec![vec![1]]))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));
    }
}
