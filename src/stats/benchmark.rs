//! Global and per-worker statistics for a benchmark run

use crate::core::types::{ExecutionResult, QueryStats};
use crate::stats::{Aggregator, Summary};
use serde::Serialize;
use std::time::Duration;

/// Latency and cost aggregators for one scope
#[derive(Debug, Clone, Default)]
pub struct MetricPair {
    /// Execution time
    pub latency: Aggregator<Duration>,
    /// Planner cost
    pub cost: Aggregator<f64>,
}

impl MetricPair {
    /// Record one successful execution
    pub fn push(&mut self, stats: &QueryStats) {
        self.latency.push(stats.latency);
        self.cost.push(stats.cost);
    }

    /// Snapshot of both metrics
    pub fn summary(&self) -> PairSummary {
        PairSummary {
            latency: self.latency.summary(),
            cost: self.cost.summary(),
        }
    }
}

/// Snapshot of a [`MetricPair`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSummary {
    /// Execution time
    pub latency: Summary<Duration>,
    /// Planner cost
    pub cost: Summary<f64>,
}

/// Statistics collected by the fan-in consumer.
///
/// Only the consumer mutates this value, so no synchronisation is needed.
/// Per-worker pairs are created on the first successful result of a worker.
#[derive(Debug, Clone)]
pub struct BenchmarkStats {
    global: MetricPair,
    workers: Vec<Option<MetricPair>>,
    failed: Vec<usize>,
}

impl BenchmarkStats {
    /// Create empty statistics for `workers` workers
    pub fn new(workers: usize) -> Self {
        Self {
            global: MetricPair::default(),
            workers: vec![None; workers],
            failed: vec![0; workers],
        }
    }

    /// Fold one result in. Failed items only count as failures.
    pub fn push<T>(&mut self, result: &ExecutionResult<T>) {
        if result.worker >= self.workers.len() {
            self.workers.resize(result.worker + 1, None);
            self.failed.resize(result.worker + 1, 0);
        }

        match &result.outcome {
            Ok(stats) => {
                self.global.push(stats);
                self.workers[result.worker]
                    .get_or_insert_with(MetricPair::default)
                    .push(stats);
            }
            Err(_) => self.failed[result.worker] += 1,
        }
    }

    /// Aggregators across all workers
    pub fn global(&self) -> &MetricPair {
        &self.global
    }

    /// Aggregators of one worker, None until it produced a successful result
    pub fn worker(&self, worker: usize) -> Option<&MetricPair> {
        self.workers.get(worker).and_then(Option::as_ref)
    }

    /// Number of workers covered
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Total failed items
    pub fn failed(&self) -> usize {
        self.failed.iter().sum()
    }

    /// Failed items of one worker
    pub fn failed_by(&self, worker: usize) -> usize {
        self.failed.get(worker).copied().unwrap_or(0)
    }

    /// Snapshot of every scope; workers without results report zeros
    pub fn snapshot(&self) -> BenchmarkSnapshot {
        let empty = PairSummary {
            latency: Summary::empty(),
            cost: Summary::empty(),
        };
        BenchmarkSnapshot {
            global: self.global.summary(),
            workers: self
                .workers
                .iter()
                .map(|w| w.as_ref().map_or(empty, MetricPair::summary))
                .collect(),
            failed: self.failed.clone(),
        }
    }
}

/// Final statistics handed to the reports
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSnapshot {
    /// All workers combined
    pub global: PairSummary,
    /// One entry per worker, in worker order
    pub workers: Vec<PairSummary>,
    /// Failed items per worker
    pub failed: Vec<usize>,
}

/// JSON-friendly view of a snapshot with latencies in milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    /// Latency summaries, "ALL" first
    pub latency_ms: Vec<ScopeReport>,
    /// Cost summaries, "ALL" first
    pub cost: Vec<ScopeReport>,
}

/// One row of a [`SnapshotReport`]
#[derive(Debug, Clone, Serialize)]
pub struct ScopeReport {
    /// "ALL" or the worker index
    pub worker: String,
    /// Failed items in this scope
    pub failed: usize,
    /// Statistics
    #[serde(flatten)]
    pub summary: Summary<f64>,
}

impl BenchmarkSnapshot {
    /// Flatten into a serialisable report
    pub fn to_report(&self) -> SnapshotReport {
        let millis = |d: Duration| d.as_secs_f64() * 1000.0;
        let latency_ms = |s: &Summary<Duration>| {
            let mut out = s.map(millis);
            out.mean *= 1000.0;
            out.median *= 1000.0;
            out
        };

        let total_failed = self.failed.iter().sum();
        let mut latency = vec![ScopeReport {
            worker: "ALL".to_string(),
            failed: total_failed,
            summary: latency_ms(&self.global.latency),
        }];
        let mut cost = vec![ScopeReport {
            worker: "ALL".to_string(),
            failed: total_failed,
            summary: self.global.cost,
        }];

        for (i, w) in self.workers.iter().enumerate() {
            let failed = self.failed.get(i).copied().unwrap_or(0);
            latency.push(ScopeReport {
                worker: i.to_string(),
                failed,
                summary: latency_ms(&w.latency),
            });
            cost.push(ScopeReport {
                worker: i.to_string(),
                failed,
                summary: w.cost,
            });
        }

        SnapshotReport {
            latency_ms: latency,
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExecutionError;

    fn ok(worker: usize, ms: u64, cost: f64) -> ExecutionResult<()> {
        ExecutionResult {
            item: (),
            outcome: Ok(QueryStats {
                latency: Duration::from_millis(ms),
                cost,
            }),
            worker,
        }
    }

    #[test]
    fn results_feed_global_and_worker_scopes() {
        let mut stats = BenchmarkStats::new(3);
        stats.push(&ok(0, 10, 100.0));
        stats.push(&ok(2, 30, 300.0));
        stats.push(&ok(0, 20, 200.0));

        assert_eq!(stats.global().latency.count(), 3);
        assert_eq!(stats.global().cost.total(), 600.0);
        assert_eq!(stats.worker(0).unwrap().latency.total(), Duration::from_millis(30));
        assert!(stats.worker(1).is_none());
        assert_eq!(stats.worker(2).unwrap().cost.max(), 300.0);
    }

    #[test]
    fn failures_are_counted_but_not_aggregated() {
        let mut stats = BenchmarkStats::new(2);
        stats.push(&ok(1, 5, 1.0));
        stats.push(&ExecutionResult {
            item: (),
            outcome: Err(ExecutionError::Timeout(Duration::from_secs(1))),
            worker: 1,
        });

        assert_eq!(stats.global().latency.count(), 1);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.failed_by(1), 1);
        assert_eq!(stats.failed_by(0), 0);
    }

    #[test]
    fn snapshot_zeroes_idle_workers() {
        let mut stats = BenchmarkStats::new(2);
        stats.push(&ok(0, 4, 2.0));
        let snap = stats.snapshot();
        assert_eq!(snap.workers.len(), 2);
        assert_eq!(snap.workers[1].latency, Summary::empty());
        assert_eq!(snap.global.latency.count, 1);
    }

    #[test]
    fn report_uses_milliseconds() {
        let mut stats = BenchmarkStats::new(1);
        stats.push(&ok(0, 4, 2.0));
        stats.push(&ok(0, 8, 4.0));
        let report = stats.snapshot().to_report();
        assert_eq!(report.latency_ms[0].worker, "ALL");
        assert!((report.latency_ms[0].summary.total - 12.0).abs() < 1e-9);
        assert!((report.latency_ms[1].summary.mean - 6.0).abs() < 1e-9);
        assert_eq!(report.cost[1].summary.max, 4.0);
    }
}
