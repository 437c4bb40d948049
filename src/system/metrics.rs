//! Metrics collection for benchmark runs
//!
//! Workers record into a process-wide Prometheus registry. The counters are
//! cumulative over the life of the process, so a report of one run should
//! come from `BenchmarkStats`, not from here.

use crate::core::Result;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, IntCounter, IntGauge, Registry,
};

/// Global metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Query outcome counters
pub struct QueryMetrics {
    /// Queries that returned statistics
    pub succeeded: IntCounter,
    /// Queries that returned an execution error
    pub failed: IntCounter,
    /// Histogram of query latencies in seconds
    pub latency: Histogram,
}

/// Worker lifecycle metrics
pub struct WorkerMetrics {
    /// Workers currently running a bucket
    pub active: IntGauge,
    /// Workers that stopped on cancellation
    pub cancelled: IntCounter,
}

/// Centralized metrics for the worker pool
pub struct Metrics {
    /// Per-query metrics
    pub queries: QueryMetrics,
    /// Per-worker metrics
    pub workers: WorkerMetrics,
}

impl Metrics {
    /// Register every collector with `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            queries: QueryMetrics::new(registry)?,
            workers: WorkerMetrics::new(registry)?,
        })
    }

    /// Get the global metrics instance, if it could be registered
    pub fn global() -> Option<&'static Metrics> {
        static INSTANCE: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new(&REGISTRY) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::error!("Failed to initialize metrics: {}", e);
                None
            }
        });
        INSTANCE.as_ref()
    }
}

impl QueryMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            succeeded: register_int_counter_with_registry!(
                "qw_queries_succeeded_total",
                "Total number of queries executed successfully",
                registry
            )?,
            failed: register_int_counter_with_registry!(
                "qw_queries_failed_total",
                "Total number of queries that returned an error",
                registry
            )?,
            latency: register_histogram_with_registry!(
                "qw_query_latency_seconds",
                "Query execution time in seconds",
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
                registry
            )?,
        })
    }
}

impl WorkerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            active: register_int_gauge_with_registry!(
                "qw_active_workers",
                "Number of workers currently executing a bucket",
                registry
            )?,
            cancelled: register_int_counter_with_registry!(
                "qw_workers_cancelled_total",
                "Total number of workers stopped by cancellation",
                registry
            )?,
        })
    }
}

/// Marks a worker active for as long as the guard lives
pub struct ActiveWorker {
    gauge: Option<IntGauge>,
}

impl ActiveWorker {
    /// Increment the active worker gauge
    pub fn enter() -> Self {
        let gauge = Metrics::global().map(|m| m.workers.active.clone());
        if let Some(g) = &gauge {
            g.inc();
        }
        Self { gauge }
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        if let Some(g) = &self.gauge {
            g.dec();
        }
    }
}

/// Record a successful query
pub fn record_success(latency: std::time::Duration) {
    if let Some(m) = Metrics::global() {
        m.queries.succeeded.inc();
        m.queries.latency.observe(latency.as_secs_f64());
    }
}

/// Record a failed query
pub fn record_failure() {
    if let Some(m) = Metrics::global() {
        m.queries.failed.inc();
    }
}

/// Record a worker stopped by cancellation
pub fn record_cancelled_worker() {
    if let Some(m) = Metrics::global() {
        m.workers.cancelled.inc();
    }
}

/// Initialize the metrics registry by creating the global metrics instance
pub fn init_registry() {
    let _ = Metrics::global();
}

/// Get the Prometheus registry
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Collect and return all metrics as a Prometheus-formatted string
pub fn collect_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry().gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
