//! PostgreSQL / TimescaleDB executor
//!
//! Queries run under `EXPLAIN (ANALYZE, FORMAT JSON)` so the server reports
//! its own execution time and planner cost. Client-side timing would include
//! network and driver overhead.

use crate::core::error::{Error, ExecutionError, Result};
use crate::core::types::{QuerySpec, QueryStats};
use crate::workers::Executor;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde_json::Value;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Min and max CPU usage of one host for every bucket in a time range
pub const MIN_MAX_CPU_SQL: &str = "\
SELECT time_bucket($1::text::interval, ts) AS bucket, min(usage), max(usage) \
FROM cpu_usage \
WHERE host = $2 AND ts >= $3::timestamp AND ts < $4::timestamp \
GROUP BY bucket \
ORDER BY bucket";

fn explain_sql() -> String {
    format!("EXPLAIN (ANALYZE, FORMAT JSON) {}", MIN_MAX_CPU_SQL)
}

/// Executes [`QuerySpec`]s against PostgreSQL.
///
/// Each call checks a connection out of a pool sized to the worker count, so
/// every worker can have one query in flight.
pub struct PgExecutor {
    pool: Pool,
    sql: String,
}

impl PgExecutor {
    /// Build a pool of up to `connections` connections to `url` and check
    /// that the server is reachable.
    pub async fn connect(url: &str, connections: usize) -> Result<Self> {
        let connections = connections.max(1);

        let mut cfg = Config::new();
        cfg.url = Some(url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(connections));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::database(format!("Invalid connection settings: {}", e)))?;

        // deadpool connects lazily; fail here rather than on the first query.
        if let Err(e) = pool.get().await {
            error!("Database connection failed: {}", e);
            return Err(Error::database(format!("Failed to connect: {}", e)));
        }

        info!("Database pool ready with up to {} connections", connections);
        Ok(Self {
            pool,
            sql: explain_sql(),
        })
    }
}

#[async_trait]
impl Executor<QuerySpec> for PgExecutor {
    async fn execute(
        &self,
        query: &QuerySpec,
        cancel: &CancellationToken,
    ) -> std::result::Result<QueryStats, ExecutionError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ExecutionError::Connection(e.to_string()))?;
        let statement = client.prepare_cached(&self.sql).await?;

        let params: [&(dyn ToSql + Sync); 4] = [
            &query.bucket_size,
            &query.hostname,
            &query.start_time,
            &query.end_time,
        ];

        let rows = tokio::select! {
            rows = client.query(&statement, &params) => rows?,
            _ = cancel.cancelled() => {
                debug!("Cancelling in-flight query for {}", query.hostname);
                if let Err(e) = client.cancel_token().cancel_query(NoTls).await {
                    warn!("Failed to cancel query on server: {}", e);
                }
                return Err(ExecutionError::Cancelled);
            }
        };

        let row = match rows.as_slice() {
            [row] => row,
            other => {
                return Err(ExecutionError::InvalidPlan(format!(
                    "expected 1 plan row but got {}",
                    other.len()
                )))
            }
        };
        let plan: Value = row
            .try_get(0)
            .map_err(|e| ExecutionError::InvalidPlan(format!("scan: {}", e)))?;

        parse_plan(&plan)
    }
}

/// Extract execution time and cost from `EXPLAIN (ANALYZE, FORMAT JSON)` output.
///
/// The output is an array holding exactly one object whose `Plan` node carries
/// `Actual Total Time` in milliseconds and `Total Cost`.
pub fn parse_plan(plan: &Value) -> std::result::Result<QueryStats, ExecutionError> {
    let results = plan
        .as_array()
        .ok_or_else(|| ExecutionError::InvalidPlan("plan is not a JSON array".to_string()))?;
    if results.len() != 1 {
        return Err(ExecutionError::InvalidPlan(format!(
            "expected 1 plan result but got {}",
            results.len()
        )));
    }

    let node = results[0]
        .get("Plan")
        .ok_or_else(|| ExecutionError::InvalidPlan("missing Plan node".to_string()))?;
    let number = |key: &str| {
        node.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| ExecutionError::InvalidPlan(format!("missing '{}'", key)))
    };

    let millis = number("Actual Total Time")?;
    let latency = Duration::try_from_secs_f64(millis / 1000.0).map_err(|e| {
        ExecutionError::InvalidPlan(format!("bad execution time {}: {}", millis, e))
    })?;

    Ok(QueryStats {
        latency,
        cost: number("Total Cost")?,
    })
}
