//! Error types and handling for the query benchmark
//!
//! Configuration and dispatch errors abort a run before any worker starts.
//! Execution errors are per item and travel inside results instead.

use std::time::Duration;
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the query benchmark
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A balancer rejected a value
    #[error("Balancer error: {0}")]
    Balance(#[from] BalanceError),

    /// Bucket assignment failed for one of the work items
    #[error("Bucketing error: {0}")]
    Bucket(#[from] BucketError),

    /// The work source could not be parsed
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Database connection errors
    #[error("Database error: {0}")]
    Database(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Errors raised by a balancer when it cannot place a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// Bucket count was zero
    #[error("bucket count must be at least 1")]
    NoBuckets,

    /// The value does not have the shape this balancer reads
    #[error("{balancer} balancer expects {expected} but got {actual}")]
    TypeMismatch {
        /// Name of the balancer strategy
        balancer: &'static str,
        /// Shape the balancer accepts
        expected: &'static str,
        /// Shape of the value it was given
        actual: &'static str,
    },

    /// A structured value lacks the field the adapter extracts
    #[error("{actual} has no field '{field}'")]
    MissingField {
        /// Requested field name
        field: String,
        /// Shape of the value it was given
        actual: &'static str,
    },

    /// A routing key does not end in a decimal id
    #[error("failed to parse id from key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Parser message
        reason: String,
    },
}

/// Bucketing failure for a single item; the whole partition is discarded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("balancer failed to assign item {index} ({item}): {source}")]
pub struct BucketError {
    /// Position of the item in the input sequence
    pub index: usize,
    /// Debug rendering of the item
    pub item: String,
    /// Underlying balancer error
    #[source]
    pub source: BalanceError,
}

/// Per-item execution errors reported by an executor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Connection to the data store failed or was lost
    #[error("connection error: {0}")]
    Connection(String),

    /// The query itself failed
    #[error("query: {0}")]
    Query(String),

    /// The query plan could not be read
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The query exceeded its deadline
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled while the query was in flight
    #[error("query cancelled")]
    Cancelled,
}

/// Errors produced while reading work items
#[derive(Error, Debug)]
pub enum InputError {
    /// Malformed CSV
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    /// A record has fewer fields than required
    #[error("missing field '{field}' on line {line}")]
    MissingField {
        /// Name of the missing column
        field: &'static str,
        /// 1-based line number
        line: u64,
    },

    /// A timestamp column could not be parsed
    #[error("failed to parse {field} (line {line}, column {column}): {source}")]
    Timestamp {
        /// Name of the column
        field: &'static str,
        /// 1-based line number
        line: u64,
        /// 1-based column number
        column: usize,
        /// Parser error
        #[source]
        source: chrono::ParseError,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error was raised before any work started
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Balance(_) | Error::Bucket(_) | Error::Input(_)
        )
    }
}

impl ExecutionError {
    /// Check if the executor reported its query as cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled)
    }
}

impl From<tokio_postgres::Error> for ExecutionError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.is_closed() {
            ExecutionError::Connection(e.to_string())
        } else {
            ExecutionError::Query(e.to_string())
        }
    }
}
