//! Metrics collection for MatrixPool
//!
//! Prometheus counters for dispatch outcomes on the coordinator and compute
//! activity on the workers. Collection can be switched off at startup from
//! `observability.enable_metrics`; updates and snapshots are then skipped.

use lazy_static::lazy_static;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Metrics registry for MatrixPool
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub coordinator: CoordinatorMetrics,
    pub worker: WorkerMetrics,
    enabled: Arc<AtomicBool>,
}

/// Coordinator-specific metrics
#[derive(Debug, Clone)]
pub struct CoordinatorMetrics {
    /// Operations submitted
    pub requests_total: IntCounter,

    /// Rejected because every worker was busy
    pub no_workers_available: IntCounter,

    /// Selected worker could not be reached
    pub worker_connection_failures: IntCounter,

    /// Selected worker was reached but the call failed
    pub worker_computation_failures: IntCounter,

    /// Workers currently marked busy
    pub busy_workers: IntGauge,

    /// Worker round trip duration
    pub dispatch_duration: Histogram,
}

/// Worker-specific metrics
#[derive(Debug, Clone)]
pub struct WorkerMetrics {
    /// Computations executed, by kind
    pub computations_total: IntCounterVec,

    /// Operations rejected as invalid
    pub invalid_operations: IntCounter,

    /// Kernel duration
    pub compute_duration: Histogram,
}

lazy_static! {
    /// Global metrics registry instance
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        // Coordinator metrics
        let requests_total = IntCounter::new(
            "coordinator_requests_total",
            "Total number of operations submitted to the coordinator"
        ).unwrap();

        let no_workers_available = IntCounter::new(
            "coordinator_no_workers_available_total",
            "Total operations rejected because every worker was busy"
        ).unwrap();

        let worker_connection_failures = IntCounter::new(
            "coordinator_worker_connection_failures_total",
            "Total dispatches that could not connect to the selected worker"
        ).unwrap();

        let worker_computation_failures = IntCounter::new(
            "coordinator_worker_computation_failures_total",
            "Total dispatches whose worker call failed after connecting"
        ).unwrap();

        let busy_workers = IntGauge::new(
            "coordinator_busy_workers",
            "Current number of workers with a dispatch in flight"
        ).unwrap();

        let dispatch_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "coordinator_dispatch_duration_seconds",
                "Worker round trip duration in seconds"
            ).buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0])
        ).unwrap();

        // Worker metrics
        let computations_total = IntCounterVec::new(
            Opts::new("worker_computations_total", "Total computations executed by kind"),
            &["kind"]
        ).unwrap();

        let invalid_operations = IntCounter::new(
            "worker_invalid_operations_total",
            "Total operations rejected as invalid"
        ).unwrap();

        let compute_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "worker_compute_duration_seconds",
                "Matrix kernel duration in seconds"
            ).buckets(vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
        ).unwrap();

        // Register all metrics
        registry.register(Box::new(requests_total.clone())).unwrap();
        registry.register(Box::new(no_workers_available.clone())).unwrap();
        registry.register(Box::new(worker_connection_failures.clone())).unwrap();
        registry.register(Box::new(worker_computation_failures.clone())).unwrap();
        registry.register(Box::new(busy_workers.clone())).unwrap();
        registry.register(Box::new(dispatch_duration.clone())).unwrap();

        registry.register(Box::new(computations_total.clone())).unwrap();
        registry.register(Box::new(invalid_operations.clone())).unwrap();
        registry.register(Box::new(compute_duration.clone())).unwrap();

        let coordinator = CoordinatorMetrics {
            requests_total,
            no_workers_available,
            worker_connection_failures,
            worker_computation_failures,
            busy_workers,
            dispatch_duration,
        };

        let worker = WorkerMetrics {
            computations_total,
            invalid_operations,
            compute_duration,
        };

        MetricsRegistry {
            registry,
            coordinator,
            worker,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Turn collection on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Text snapshot, or `None` when collection is disabled
    pub fn snapshot(&self) -> Option<String> {
        self.is_enabled().then(|| self.gather())
    }

    /// Gather all metrics as text
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            return format!("# failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper trait for measuring latency
pub trait LatencyTimer {
    /// Observe the duration of a closure
    fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R;
}

impl LatencyTimer for Histogram {
    fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = std::time::Instant::now();
        let result = f();
        self.observe(start.elapsed().as_secs_f64());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry() {
        let metrics = MetricsRegistry::new();

        metrics.coordinator.requests_total.inc();
        metrics.coordinator.busy_workers.set(2);
        metrics.worker.computations_total.with_label_values(&["add"]).inc();

        let output = metrics.gather();
        assert!(output.contains("coordinator_requests_total 1"));
        assert!(output.contains("coordinator_busy_workers 2"));
        assert!(output.contains("worker_computations_total{kind=\"add\"} 1"));
    }

    #[test]
    fn test_disabled_registry_has_no_snapshot() {
        let metrics = MetricsRegistry::new();
        assert!(metrics.snapshot().is_some());

        let shared = metrics.clone();
        shared.set_enabled(false);
        assert!(!metrics.is_enabled());
        assert!(metrics.snapshot().is_none());
    }

    #[test]
    fn test_latency_timer() {
        let metrics = MetricsRegistry::new();
        let value = metrics.worker.compute_duration.time(|| 42);

        assert_eq!(value, 42);
        assert_eq!(metrics.worker.compute_duration.get_sample_count(), 1);
    }
}
