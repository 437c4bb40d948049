//! Query Workers - concurrent query benchmarking with online statistics
//!
//! Query Workers distributes a batch of read-only queries over a fixed pool
//! of concurrent workers, runs them against PostgreSQL / TimescaleDB and
//! keeps running latency and cost statistics (count, total, min, max, mean,
//! median) globally and per worker.
#![warn(missing_docs)]

// Configure global allocator for maximum performance
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

// Core foundational modules
pub mod core;
pub mod structures;
pub mod stats;

// Main functional modules
pub mod balance;
pub mod workers;
pub mod db;
pub mod input;
pub mod report;
pub mod system;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, ExecutionResult, QuerySpec, QueryStats, Result};

use crate::core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize tracing and the metrics registry.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so reports on stdout stay machine readable.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to install logger: {}", e)))?;

    tracing::debug!("Initializing {} v{}", NAME, VERSION);

    system::metrics::init_registry();

    Ok(())
}
