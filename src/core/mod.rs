//! Core system types and foundations
//!
//! Error handling, configuration and the data types that flow between the
//! balancer, the worker pool and the aggregators.

pub mod types;
pub mod error;
pub mod config;

// Re-export commonly used items
pub use types::{QuerySpec, QueryStats, ExecutionResult};
pub use error::{Error, Result, BalanceError, BucketError, ExecutionError, InputError};
pub use config::Config;
