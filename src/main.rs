//! Query Workers benchmark
//!
//! Reads query parameters from a CSV file or stdin, runs them across a pool
//! of concurrent workers against PostgreSQL and prints latency and cost
//! statistics.

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, Command};
use query_workers::core::config::Config;
use query_workers::db::PgExecutor;
use query_workers::workers::{PoolOptions, WorkerPool};
use query_workers::{input, report, system, QuerySpec};
use std::fs::File;
use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let matches = Command::new("query-workers")
        .version(query_workers::VERSION)
        .about("Benchmark min/max CPU queries across concurrent workers.")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("CSV file of query parameters (read from stdin when piped)")
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("N")
                .help("Number of concurrent workers")
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("URL")
                .help("Database connection string (defaults to the DB environment variable)")
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
        )
        .arg(
            Arg::new("balancer")
                .long("balancer")
                .value_name("KIND")
                .help("Work distribution (random, id, hash)")
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("DURATION")
                .help("Per-query timeout, e.g. 30s")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Report format (table, json)")
        )
        .arg(
            Arg::new("print-metrics")
                .long("print-metrics")
                .action(ArgAction::SetTrue)
                .help("Print Prometheus metrics after the report")
        )
        .get_matches();

    // Load configuration; validated once every layer is applied
    let mut config = Config::read(matches.get_one::<String>("config").map(String::as_str))?;

    // Apply CLI overrides
    apply_cli_overrides(&mut config, &matches)?;
    config.validate()?;

    query_workers::init_logging(&config.logging)?;
    info!("Starting {} v{}", query_workers::NAME, query_workers::VERSION);

    let queries = read_input(matches.get_one::<String>("file"), &config.bench.bucket_size)?;

    let Some(url) = config.database.url.clone() else {
        bail!("must provide a database connection string through --db or the DB environment variable");
    };
    let executor = PgExecutor::connect(&url, config.bench.concurrency)
        .await
        .context("failed to open database connections")?;

    let pool = WorkerPool::new(Arc::new(executor), PoolOptions::from(&config.bench));
    let balancer = config.balancer();

    println!(
        "Benchmarking {} queries across {} workers...",
        queries.len(),
        config.bench.concurrency
    );

    let handle = pool
        .dispatch(queries, &balancer)
        .context("failed to assign queries to workers")?;

    // Setup graceful shutdown handling
    let cancel = pool.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, cancelling remaining queries...");
        cancel.cancel();
    });

    let print_results = config.report.print_results;
    let stats = pool
        .drain(handle, |result| {
            if print_results {
                println!("{}", report::result_line(result));
            }
        })
        .await?;

    println!();
    print!("{}", report::render(&stats.snapshot(), config.report.format)?);

    if config.report.print_metrics {
        println!();
        print!("{}", system::metrics::collect_metrics());
    }

    Ok(())
}

/// Apply command line argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, matches: &clap::ArgMatches) -> anyhow::Result<()> {
    if let Some(concurrency) = matches.get_one::<String>("concurrency") {
        config.bench.concurrency = concurrency
            .parse()
            .with_context(|| format!("Invalid concurrency: {}", concurrency))?;
    }

    if let Some(url) = matches.get_one::<String>("db") {
        config.database.url = Some(url.clone());
    }

    if let Some(balancer) = matches.get_one::<String>("balancer") {
        config.bench.balancer = balancer.parse()?;
    }

    if let Some(timeout) = matches.get_one::<String>("timeout") {
        let timeout = query_workers::core::config::parse_duration(timeout)
            .map_err(|e| query_workers::Error::config(format!("Invalid timeout: {}", e)))?;
        config.bench.query_timeout = Some(timeout);
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    if let Some(format) = matches.get_one::<String>("format") {
        config.report.format = format.parse()?;
    }

    if matches.get_flag("print-metrics") {
        config.report.print_metrics = true;
    }

    Ok(())
}

/// Read queries from stdin when it is piped, otherwise from the named file
fn read_input(file: Option<&String>, bucket_size: &str) -> anyhow::Result<Vec<QuerySpec>> {
    let stdin = io::stdin();
    let source: Box<dyn Read> = if !stdin.is_terminal() && file.is_none() {
        Box::new(stdin.lock())
    } else {
        match file {
            Some(path) => Box::new(
                File::open(path).with_context(|| format!("failed to open {}", path))?,
            ),
            None => bail!("must provide filename argument or stdin"),
        }
    };

    let queries = input::read_queries(source, bucket_size)?;
    if queries.is_empty() {
        bail!("no queries found in input");
    }
    Ok(queries)
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
