//! Coordinator RPC server
//!
//! Hosts `Coordinator.ProcessRequest` and `Coordinator.Shutdown` on one
//! listener. The accept loop ends when the shutdown coordinator has visited
//! every worker, or when the caller's own stop future resolves.

use crate::dispatcher::Dispatcher;
use crate::shutdown::ShutdownCoordinator;
use matrixpool_common::{Result, RpcServer};
use matrixpool_proto::{methods, Operation};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

/// Coordinator RPC server
pub struct CoordinatorServer {
    dispatcher: Arc<Dispatcher>,
}

impl CoordinatorServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Serve until an administrative shutdown completes
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_until(listener, std::future::pending()).await
    }

    /// Serve until an administrative shutdown completes or `stop` resolves
    pub async fn serve_until<S>(self, listener: TcpListener, stop: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let shutdown = ShutdownCoordinator::spawn(self.dispatcher.clone(), stop_tx);

        let mut rpc = RpcServer::new("coordinator");

        let dispatcher = self.dispatcher.clone();
        rpc.register(methods::PROCESS_REQUEST, move |op: Operation| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.submit(op).await }
        });

        rpc.register(methods::SHUTDOWN, move |payload: String| {
            let reply = shutdown.trigger(payload);
            async move { reply }
        });

        info!(
            "Coordinator dispatching to {} worker(s)",
            self.dispatcher.worker_addresses().len()
        );

        rpc.serve(listener, async move {
            tokio::select! {
                _ = stop_rx => {}
                _ = stop => {}
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CoordinatorClient;
    use crate::registry::WorkerRegistry;
    use crate::shutdown::SHUTDOWN_ACK;
    use matrixpool_common::PoolError;
    use matrixpool_proto::{OperationKind, OperationResult};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct Cluster {
        coordinator: CoordinatorClient,
        coordinator_handle: JoinHandle<Result<()>>,
        worker_addresses: Vec<String>,
        _worker_stops: Vec<oneshot::Sender<()>>,
    }

    async fn start_worker() -> (String, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(matrixpool_worker::server::serve(listener, async move {
            let _ = rx.await;
        }));
        (addr, tx)
    }

    async fn start_cluster(extra_endpoints: &[String]) -> Cluster {
        let mut worker_addresses = extra_endpoints.to_vec();
        let mut worker_stops = Vec::new();
        for _ in 0..3 {
            let (addr, stop) = start_worker().await;
            worker_addresses.push(addr);
            worker_stops.push(stop);
        }

        let dispatcher = Arc::new(Dispatcher::with_tcp(WorkerRegistry::new(worker_addresses.clone())));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let coordinator = CoordinatorClient::new(listener.local_addr().unwrap().to_string());
        let coordinator_handle = tokio::spawn(CoordinatorServer::new(dispatcher).serve(listener));

        Cluster {
            coordinator,
            coordinator_handle,
            worker_addresses,
            _worker_stops: worker_stops,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenarios() {
        let cluster = start_cluster(&[]).await;

        let result = cluster
            .coordinator
            .submit(&Operation::add(vec![vec![1, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]))
            .await
            .unwrap();
        assert_eq!(result.matrix, Some(vec![vec![6, 8], vec![10, 12]]));

        let result = cluster
            .coordinator
            .submit(&Operation::transpose(vec![vec![1, 2, 3], vec![4, 5, 6]]))
            .await
            .unwrap();
        assert_eq!(result.matrix, Some(vec![vec![1, 4], vec![2, 5], vec![3, 6]]));

        let result = cluster
            .coordinator
            .submit(&Operation::multiply(vec![vec![1, 2], vec![3, 4]], vec![vec![2, 0], vec![1, 2]]))
            .await
            .unwrap();
        assert_eq!(result.matrix, Some(vec![vec![4, 4], vec![10, 8]]));
    }

    #[tokio::test]
    async fn test_outer_product_larger_than_request() {
        let cluster = start_cluster(&[]).await;

        // ~17 MB of JSON back from a request of a few KB
        let n = 1200;
        let column = vec![vec![123_456]; n];
        let row = vec![vec![123_456; n]];
        let result = cluster
            .coordinator
            .submit(&Operation::multiply(column, row))
            .await
            .unwrap();

        assert_eq!(result.error, None);
        let matrix = result.matrix.unwrap();
        assert_eq!(matrix.len(), n);
        assert!(matrix.iter().all(|r| r.len() == n && r.iter().all(|&v| v == 123_456 * 123_456)));
    }

    #[tokio::test]
    async fn test_unknown_kind_reaches_worker_as_invalid_operation() {
        let cluster = start_cluster(&[]).await;

        // Bypass client-side validation
        let op = Operation {
            kind: OperationKind::Unknown("divide".to_string()),
            matrix_a: vec![vec![1]],
            matrix_b: None,
        };
        let result: OperationResult =
            matrixpool_common::call(cluster.coordinator.address(), methods::PROCESS_REQUEST, &op)
                .await
                .unwrap();
        assert_eq!(result.error.as_deref(), Some("Invalid operation"));
    }

    #[tokio::test]
    async fn test_dead_worker_first_in_line() {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = probe.local_addr().unwrap().to_string();
        drop(probe);

        let cluster = start_cluster(&[dead]).await;
        let op = Operation::transpose(vec![vec![1, 2]]);

        // The dead worker is reselected every time; the rest of the pool stays idle
        for _ in 0..2 {
            let result = cluster.coordinator.submit(&op).await.unwrap();
            assert_eq!(result.error.as_deref(), Some("Worker connection failed"));
        }
    }

    #[tokio::test]
    async fn test_admin_shutdown_stops_coordinator_not_workers() {
        let cluster = start_cluster(&[]).await;

        let ack = cluster.coordinator.shutdown().await.unwrap();
        assert_eq!(ack, SHUTDOWN_ACK);

        tokio::time::timeout(Duration::from_secs(5), cluster.coordinator_handle)
            .await
            .expect("coordinator did not stop")
            .unwrap()
            .unwrap();

        let err = cluster
            .coordinator
            .submit(&Operation::transpose(vec![vec![1]]))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));

        // Workers run on their own shutdown signal
        let result: OperationResult = matrixpool_common::call(
            &cluster.worker_addresses[0],
            methods::COMPUTE,
            &Operation::transpose(vec![vec![7, 8]]),
        )
        .await
        .unwrap();
        assert_eq!(result.matrix, Some(vec![vec![7], vec![8]]));
    }

    #[tokio::test]
    async fn test_external_stop() {
        let dispatcher = Arc::new(Dispatcher::with_tcp(WorkerRegistry::new(["127.0.0.1:1"])));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(CoordinatorServer::new(dispatcher).serve_until(listener, async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("coordinator did not stop")
            .unwrap()
            .unwrap();
    }
}
