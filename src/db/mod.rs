//! Data store executors

pub mod postgres;

pub use postgres::{parse_plan, PgExecutor, MIN_MAX_CPU_SQL};
