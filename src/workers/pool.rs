//! Fan-out of bucketed work to concurrent workers and fan-in of results
//!
//! A run moves through `Idle -> Dispatching -> Executing -> Draining ->
//! Completed`, or ends in `Aborted` when setup fails before any worker
//! starts. Each bucket gets one worker task. Workers publish into a bounded
//! channel that closes once the last worker drops its sender; a single
//! consumer folds the results into [`BenchmarkStats`].

use crate::balance::{partition, Balance, Routable};
use crate::core::config::BenchConfig;
use crate::core::error::{Error, ExecutionError, Result};
use crate::core::types::{ExecutionResult, QueryStats};
use crate::stats::BenchmarkStats;
use crate::system::metrics::{self, ActiveWorker};
use crate::workers::executor::Executor;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long an executor may take to wind down after its token fires
pub const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Settings for one pool
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOptions {
    /// Number of workers, and of buckets
    pub concurrency: usize,
    /// Capacity of the result channel
    pub channel_capacity: usize,
    /// Deadline for a single execution
    pub query_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            channel_capacity: 1,
            query_timeout: None,
        }
    }
}

impl From<&BenchConfig> for PoolOptions {
    fn from(config: &BenchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            channel_capacity: config.channel_capacity,
            query_timeout: config.query_timeout,
        }
    }
}

impl PoolOptions {
    /// Reject settings no run can start with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency < 1 {
            return Err(Error::config("Concurrency must be at least 1"));
        }
        if self.channel_capacity < 1 {
            return Err(Error::config("Channel capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing dispatched yet
    Idle,
    /// Partitioning work into buckets
    Dispatching,
    /// Workers are running
    Executing,
    /// Consumer is reading the remaining results
    Draining,
    /// Every worker exited and every result was consumed
    Completed,
    /// Setup failed; no worker ran
    Aborted,
}

/// How a worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Worker (and bucket) index
    pub worker: usize,
    /// Results published
    pub published: usize,
    /// Items left unexecuted
    pub skipped: usize,
    /// True when the worker stopped on cancellation
    pub cancelled: bool,
}

/// A dispatched run: the live result stream plus the worker supervisor
pub struct RunHandle<T> {
    results: mpsc::Receiver<ExecutionResult<T>>,
    workers: JoinSet<WorkerExit>,
    concurrency: usize,
}

impl<T> RunHandle<T> {
    /// Next result, or None once every worker has finished
    pub async fn recv(&mut self) -> Option<ExecutionResult<T>> {
        self.results.recv().await
    }

    /// Number of workers in this run
    pub fn worker_count(&self) -> usize {
        self.concurrency
    }

    /// Wait for every worker to exit.
    ///
    /// Call after the result stream is exhausted; a worker blocked on a full
    /// channel would otherwise never finish.
    pub async fn join(mut self) -> Result<Vec<WorkerExit>> {
        drop(self.results);
        let mut exits = Vec::with_capacity(self.concurrency);
        while let Some(joined) = self.workers.join_next().await {
            let exit = joined.map_err(|e| Error::internal(format!("Worker task failed: {}", e)))?;
            exits.push(exit);
        }
        exits.sort_by_key(|e| e.worker);
        Ok(exits)
    }
}

/// Runs bucketed work items through a shared executor
pub struct WorkerPool<E> {
    executor: Arc<E>,
    options: PoolOptions,
    cancel: CancellationToken,
    phase: watch::Sender<RunPhase>,
}

impl<E> WorkerPool<E> {
    /// Create a pool around `executor`
    pub fn new(executor: Arc<E>, options: PoolOptions) -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            executor,
            options,
            cancel: CancellationToken::new(),
            phase,
        }
    }

    /// Pool settings
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Token observed by every worker of this pool
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask every worker to stop. Results already published stay valid.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current phase
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: RunPhase) {
        debug!("Run phase: {:?}", phase);
        self.phase.send_replace(phase);
    }
}

impl<E> WorkerPool<E> {
    /// Partition `items` and start one worker per bucket.
    ///
    /// Fails without starting any worker when the options are invalid, the
    /// work source is empty, or the balancer rejects an item.
    pub fn dispatch<T>(&self, items: Vec<T>, balancer: &dyn Balance) -> Result<RunHandle<T>>
    where
        T: Routable + Debug + Send + Sync + 'static,
        E: Executor<T> + 'static,
    {
        if let Err(e) = self.options.validate() {
            self.set_phase(RunPhase::Aborted);
            return Err(e);
        }
        if items.is_empty() {
            self.set_phase(RunPhase::Aborted);
            return Err(Error::config("No work items to execute"));
        }

        self.set_phase(RunPhase::Dispatching);
        let total = items.len();
        let buckets = match partition(items, self.options.concurrency, balancer) {
            Ok(buckets) => buckets,
            Err(e) => {
                self.set_phase(RunPhase::Aborted);
                return Err(e.into());
            }
        };

        info!(
            "Dispatching {} items to {} workers",
            total, self.options.concurrency
        );

        let (tx, rx) = mpsc::channel(self.options.channel_capacity);
        let mut workers = JoinSet::new();
        for (worker, bucket) in buckets.into_iter().enumerate() {
            let ctx = WorkerContext {
                worker,
                executor: self.executor.clone(),
                results: tx.clone(),
                cancel: self.cancel.clone(),
                query_timeout: self.options.query_timeout,
            };
            workers.spawn(ctx.run(bucket));
        }
        // The channel closes when the last worker drops its clone.
        drop(tx);

        self.set_phase(RunPhase::Executing);
        Ok(RunHandle {
            results: rx,
            workers,
            concurrency: self.options.concurrency,
        })
    }

    /// Consume every result of `handle`, calling `observer` on each, then
    /// wait for the workers to exit.
    pub async fn drain<T>(
        &self,
        mut handle: RunHandle<T>,
        mut observer: impl FnMut(&ExecutionResult<T>),
    ) -> Result<BenchmarkStats> {
        self.set_phase(RunPhase::Draining);

        let mut stats = BenchmarkStats::new(handle.worker_count());
        while let Some(result) = handle.recv().await {
            observer(&result);
            stats.push(&result);
        }

        let exits = handle.join().await?;
        let cancelled = exits.iter().filter(|e| e.cancelled).count();
        if cancelled > 0 {
            let skipped: usize = exits.iter().map(|e| e.skipped).sum();
            warn!(
                "Run cancelled: {} workers stopped early, {} items not executed",
                cancelled, skipped
            );
        }

        info!(
            "Run complete: {} succeeded, {} failed",
            stats.global().latency.count(),
            stats.failed()
        );
        self.set_phase(RunPhase::Completed);
        Ok(stats)
    }

    /// Dispatch and drain in one call
    pub async fn run<T>(&self, items: Vec<T>, balancer: &dyn Balance) -> Result<BenchmarkStats>
    where
        T: Routable + Debug + Send + Sync + 'static,
        E: Executor<T> + 'static,
    {
        let handle = self.dispatch(items, balancer)?;
        self.drain(handle, |_| {}).await
    }
}

/// Everything one worker task owns
struct WorkerContext<E, T> {
    worker: usize,
    executor: Arc<E>,
    results: mpsc::Sender<ExecutionResult<T>>,
    cancel: CancellationToken,
    query_timeout: Option<Duration>,
}

impl<E, T> WorkerContext<E, T>
where
    E: Executor<T>,
    T: Send + Sync,
{
    /// Execute the bucket in order, publishing one result per item
    async fn run(self, bucket: Vec<T>) -> WorkerExit {
        let _active = ActiveWorker::enter();
        let total = bucket.len();
        debug!("Worker {} started with {} items", self.worker, total);

        let mut published = 0;
        for item in bucket {
            if self.cancel.is_cancelled() {
                return self.stopped(published, total);
            }

            let outcome = self.execute(&item).await;

            // Only the run's token stops a worker; an executor reporting
            // Cancelled on its own is an ordinary item failure.
            if self.cancel.is_cancelled() {
                return self.stopped(published, total);
            }

            match &outcome {
                Ok(stats) => metrics::record_success(stats.latency),
                Err(e) if e.is_cancelled() => {
                    warn!("Worker {} query cancelled outside the run", self.worker);
                    metrics::record_failure();
                }
                Err(e) => {
                    warn!("Worker {} query failed: {}", self.worker, e);
                    metrics::record_failure();
                }
            }

            let result = ExecutionResult {
                item,
                outcome,
                worker: self.worker,
            };
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.stopped(published, total),
                sent = self.results.send(result) => sent,
            };
            if sent.is_err() {
                debug!("Worker {} result stream closed", self.worker);
                return self.stopped(published, total);
            }
            published += 1;
        }

        debug!("Worker {} finished {} items", self.worker, published);
        WorkerExit {
            worker: self.worker,
            published,
            skipped: 0,
            cancelled: false,
        }
    }

    /// Run one item, racing the run's token and the per-query deadline.
    ///
    /// The executor gets a child token. When the run is cancelled or the
    /// deadline passes, that token fires and the executor is polled for up
    /// to [`CANCEL_GRACE`] so it can abort the query on the server.
    async fn execute(&self, item: &T) -> std::result::Result<QueryStats, ExecutionError> {
        let token = self.cancel.child_token();
        let mut fut = self.executor.execute(item, &token);
        let limit = self.query_timeout.unwrap_or_default();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ExecutionError::Cancelled),
            outcome = &mut fut => return outcome,
            _ = tokio::time::sleep(limit), if self.query_timeout.is_some() => {
                Err(ExecutionError::Timeout(limit))
            }
        };

        token.cancel();
        if tokio::time::timeout(CANCEL_GRACE, fut).await.is_err() {
            debug!("Worker {} executor ignored cancellation", self.worker);
        }
        outcome
    }

    fn stopped(&self, published: usize, total: usize) -> WorkerExit {
        debug!("Worker {} cancelled after {} items", self.worker, published);
        metrics::record_cancelled_worker();
        WorkerExit {
            worker: self.worker,
            published,
            skipped: total - published,
            cancelled: true,
        }
    }
}
