//! Request dispatch
//!
//! Selects the first free worker, forwards the operation and frees the worker
//! again. The registry and the pending queue sit behind one mutex that is only
//! held for the select/mark steps, never across the worker round trip.

use crate::registry::{WorkerEntry, WorkerRegistry};
use crate::worker_client::{TcpWorkerConnector, WorkerConnector};
use matrixpool_common::METRICS;
use matrixpool_proto::{Operation, OperationError, OperationResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// State guarded by the dispatcher lock
#[derive(Debug)]
struct PoolState {
    registry: WorkerRegistry,

    /// Append-only audit log of submitted operations; never drained
    pending: Vec<Operation>,
}

/// Coordinator-side dispatcher
pub struct Dispatcher {
    state: Mutex<PoolState>,
    connector: Arc<dyn WorkerConnector>,
}

/// Frees the selected worker when the dispatch ends, however it ends
struct BusyGuard<'a> {
    state: &'a Mutex<PoolState>,
    index: usize,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.registry.mark_free(self.index);
        record_busy(&state.registry);
    }
}

fn record_busy(registry: &WorkerRegistry) {
    if METRICS.is_enabled() {
        METRICS.coordinator.busy_workers.set(registry.busy_count() as i64);
    }
}

impl Dispatcher {
    /// Create a dispatcher over `registry` using `connector` for worker calls
    pub fn new(registry: WorkerRegistry, connector: Arc<dyn WorkerConnector>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                registry,
                pending: Vec::new(),
            }),
            connector,
        }
    }

    /// Create a dispatcher that talks to workers over TCP
    pub fn with_tcp(registry: WorkerRegistry) -> Self {
        Self::new(registry, Arc::new(TcpWorkerConnector))
    }

    /// Dispatch one operation to a free worker and wait for its result
    ///
    /// Fails fast with "No available workers" when every worker is busy.
    /// There is no queueing and no retry.
    pub async fn submit(&self, op: Operation) -> OperationResult {
        if METRICS.is_enabled() {
            METRICS.coordinator.requests_total.inc();
        }
        self.state.lock().pending.push(op.clone());

        let (index, address) = {
            let mut state = self.state.lock();
            let Some(index) = state.registry.select_free() else {
                if METRICS.is_enabled() {
                    METRICS.coordinator.no_workers_available.inc();
                }
                warn!("No available workers for {} request", op.kind);
                return OperationError::NoAvailableWorkers.into();
            };

            state.registry.mark_busy(index);
            record_busy(&state.registry);
            (index, state.registry.entries()[index].address.clone())
        };

        let guard = BusyGuard {
            state: &self.state,
            index,
        };

        let span = info_span!(
            "dispatch",
            id = %Uuid::new_v4(),
            kind = %op.kind,
            worker = %address
        );

        let outcome = async {
            let start = Instant::now();
            let outcome = self.connector.compute(&address, &op).await;
            if METRICS.is_enabled() {
                METRICS
                    .coordinator
                    .dispatch_duration
                    .observe(start.elapsed().as_secs_f64());
            }
            outcome
        }
        .instrument(span.clone())
        .await;

        drop(guard);

        let _entered = span.enter();
        match outcome {
            Ok(result) => {
                debug!("Worker {} answered (error: {:?})", address, result.error);
                result
            }
            Err(e) => {
                let failure = e.to_operation_error();
                if METRICS.is_enabled() {
                    match failure {
                        OperationError::WorkerConnectionFailed => {
                            METRICS.coordinator.worker_connection_failures.inc();
                        }
                        _ => {
                            METRICS.coordinator.worker_computation_failures.inc();
                        }
                    }
                }
                warn!("Dispatch to {} failed: {}", address, e);
                failure.into()
            }
        }
    }

    /// Worker endpoints in registration order
    pub fn worker_addresses(&self) -> Vec<String> {
        self.state.lock().registry.addresses()
    }

    /// Copy of every worker entry with its current busy flag
    pub fn workers(&self) -> Vec<WorkerEntry> {
        self.state.lock().registry.entries().to_vec()
    }

    /// Number of operations ever submitted
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}
