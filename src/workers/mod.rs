//! Concurrent execution of bucketed work

pub mod executor;
pub mod pool;

pub use executor::Executor;
pub use pool::{PoolOptions, RunHandle, RunPhase, WorkerExit, WorkerPool};
