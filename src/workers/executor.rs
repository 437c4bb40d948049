//! The seam between the worker pool and the data store

use crate::core::error::ExecutionError;
use crate::core::types::QueryStats;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Runs one work item and measures it.
///
/// The pool shares a single executor between all of its workers, so
/// implementations must accept concurrent calls. `cancel` fires when the run
/// is aborted; an executor that notices it should return
/// [`ExecutionError::Cancelled`] promptly.
#[async_trait]
pub trait Executor<T>: Send + Sync {
    /// Execute `item` once. No retries.
    async fn execute(
        &self,
        item: &T,
        cancel: &CancellationToken,
    ) -> Result<QueryStats, ExecutionError>;
}
