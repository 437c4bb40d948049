//! Core data types shared by the balancer, the worker pool and the reports

use crate::core::error::ExecutionError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timestamp layout used by query parameter files and result lines
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Retrieves the min and max CPU usage of one host for every bucket in a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Postgres INTERVAL literal, e.g. "1m"
    pub bucket_size: String,
    /// Host the query targets; also the routing key
    pub hostname: String,
    /// Inclusive range start
    pub start_time: NaiveDateTime,
    /// Exclusive range end
    pub end_time: NaiveDateTime,
}

impl QuerySpec {
    /// Maximum number of one minute buckets this query could return
    pub fn max_buckets(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.hostname,
            self.start_time.format(TIME_FORMAT),
            self.end_time.format(TIME_FORMAT)
        )
    }
}

/// Measurements taken for one executed query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    /// Execution time reported by the data store
    pub latency: Duration,
    /// Planner cost estimate
    pub cost: f64,
}

/// Outcome of one work item, published by the worker that ran it
#[derive(Debug)]
pub struct ExecutionResult<T> {
    /// The item that was executed
    pub item: T,
    /// Measurements, or the executor's error
    pub outcome: std::result::Result<QueryStats, ExecutionError>,
    /// Index of the worker (and bucket) that produced this result
    pub worker: usize,
}

impl<T> ExecutionResult<T> {
    /// Measurements of a successful execution
    pub fn stats(&self) -> Option<&QueryStats> {
        self.outcome.as_ref().ok()
    }

    /// Error of a failed execution
    pub fn error(&self) -> Option<&ExecutionError> {
        self.outcome.as_ref().err()
    }
}
