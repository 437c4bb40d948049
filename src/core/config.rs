//! Configuration management for the query benchmark
//!
//! Settings come from defaults, an optional TOML file and `QW_*` environment
//! variables, in that order, and are validated before a run starts.

use crate::balance::Balancer;
use crate::core::error::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default configuration file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "query-workers.toml";

/// Upper bound on the worker count
pub const MAX_CONCURRENCY: usize = 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Benchmark run settings
    pub bench: BenchConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Report output
    pub report: ReportConfig,
}

/// Benchmark run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of concurrent workers
    pub concurrency: usize,

    /// Time bucket applied to every query
    pub bucket_size: String,

    /// Per-query deadline (None = no deadline)
    #[serde(deserialize_with = "deserialize_opt_duration", skip_serializing)]
    pub query_timeout: Option<Duration>,

    /// Result channel capacity between workers and the aggregator
    pub channel_capacity: usize,

    /// Strategy used to route queries to workers
    pub balancer: BalancerKind,

    /// Field of each query the balancer reads
    pub routing_field: String,
}

/// Database connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string, e.g. "host=localhost user=postgres dbname=homework"
    pub url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact)
    pub format: String,
}

/// Report output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Final report rendering
    pub format: ReportFormat,

    /// Print one line per executed query while the run is in progress
    pub print_results: bool,

    /// Dump Prometheus metrics after the report
    pub print_metrics: bool,
}

/// Routing strategies selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancerKind {
    /// Uniformly random worker
    Random,
    /// Numeric id parsed from the routing key
    Id,
    /// FNV hash of the routing key
    Hash,
}

/// Final report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown tables
    Table,
    /// JSON document
    Json,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            bucket_size: "1m".to_string(),
            query_timeout: None,
            channel_capacity: 1,
            balancer: BalancerKind::Hash,
            routing_field: "hostname".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Table,
            print_results: true,
            print_metrics: false,
        }
    }
}

impl BalancerKind {
    /// Balancer that applies this strategy to the given field of each item
    pub fn for_field(self, field: &str) -> Balancer {
        let inner = match self {
            BalancerKind::Random => return Balancer::Random,
            BalancerKind::Id => Balancer::KeyId,
            BalancerKind::Hash => Balancer::KeyHash,
        };
        Balancer::field(field, inner)
    }
}

impl std::str::FromStr for BalancerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(BalancerKind::Random),
            "id" => Ok(BalancerKind::Id),
            "hash" => Ok(BalancerKind::Hash),
            _ => Err(Error::config(format!(
                "Invalid balancer: {}. Valid options: random, id, hash",
                s
            ))),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            _ => Err(Error::config(format!(
                "Invalid report format: {}. Valid options: table, json",
                s
            ))),
        }
    }
}

impl Config {
    /// Load configuration from a file (or the default file when present),
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`] but without validation, for callers that layer
    /// further overrides (command line flags) before calling `validate`.
    pub fn read(path: Option<&str>) -> Result<Self> {
        Self::read_with(path, |key| std::env::var(key).ok())
    }

    /// Read the file or defaults and apply overrides from `lookup`
    pub fn read_with(path: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Config::default(),
        };

        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply overrides from a key lookup (environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(concurrency) = lookup("QW_CONCURRENCY") {
            self.bench.concurrency = concurrency
                .parse()
                .map_err(|e| Error::config(format!("Invalid concurrency: {}", e)))?;
        }

        if let Some(balancer) = lookup("QW_BALANCER") {
            self.bench.balancer = balancer.parse()?;
        }

        if let Some(timeout) = lookup("QW_QUERY_TIMEOUT") {
            self.bench.query_timeout = Some(
                parse_duration(&timeout)
                    .map_err(|e| Error::config(format!("Invalid query timeout: {}", e)))?,
            );
        }

        if let Some(url) = lookup("DB") {
            self.database.url = Some(url);
        }

        if let Some(level) = lookup("QW_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("QW_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.bench.concurrency < 1 {
            return Err(Error::config("Concurrency must be at least 1"));
        }

        if self.bench.concurrency > MAX_CONCURRENCY {
            return Err(Error::config(format!(
                "Too many workers (maximum {})",
                MAX_CONCURRENCY
            )));
        }

        if self.bench.channel_capacity < 1 {
            return Err(Error::config("Channel capacity must be at least 1"));
        }

        if self.bench.bucket_size.trim().is_empty() {
            return Err(Error::config("Bucket size must not be empty"));
        }

        if self.bench.routing_field.trim().is_empty() {
            return Err(Error::config("Routing field must not be empty"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(Error::config("Invalid log level")),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => return Err(Error::config("Invalid log format")),
        }

        Ok(())
    }

    /// Balancer described by the bench settings
    pub fn balancer(&self) -> Balancer {
        self.bench.balancer.for_field(&self.bench.routing_field)
    }
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration string like '30s' or '500ms'")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_duration(value).map(Some).map_err(E::custom)
        }
    }

    deserializer.deserialize_str(DurationVisitor)
}

/// Simple duration parser for common formats ("250ms", "30s", "5m", "1h", bare seconds)
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().map_err(|_| "Invalid milliseconds")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = s.strip_suffix('s') {
        let secs: u64 = secs.parse().map_err(|_| "Invalid seconds")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().map_err(|_| "Invalid minutes")?;
        Ok(Duration::from_secs(mins * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        let hours: u64 = hours.parse().map_err(|_| "Invalid hours")?;
        Ok(Duration::from_secs(hours * 3600))
    } else {
        let secs: u64 = s.parse().map_err(|_| "Invalid duration format")?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bench.concurrency, 5);
        assert_eq!(config.bench.bucket_size, "1m");
        assert_eq!(config.balancer(), Balancer::field("hostname", Balancer::KeyHash));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.bench.concurrency = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn toml_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bench]
concurrency = 3
balancer = "id"
query_timeout = "250ms"

[database]
url = "host=localhost user=postgres"

[report]
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bench.concurrency, 3);
        assert_eq!(config.bench.balancer, BalancerKind::Id);
        assert_eq!(config.bench.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.bench.routing_field, "hostname");
        assert_eq!(config.database.url.as_deref(), Some("host=localhost user=postgres"));
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = Config::from_toml("[bench]\nconcurrency = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("QW_CONCURRENCY", "8"),
            ("QW_BALANCER", "random"),
            ("QW_QUERY_TIMEOUT", "2s"),
            ("DB", "postgres://bench@db/homework"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bench.concurrency, 8);
        assert_eq!(config.bench.balancer, BalancerKind::Random);
        assert_eq!(config.bench.query_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.database.url.as_deref(), Some("postgres://bench@db/homework"));
        assert_eq!(config.balancer(), Balancer::Random);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "QW_CONCURRENCY").then(|| "-2".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid concurrency"));
    }

    #[test]
    fn later_overrides_can_repair_an_invalid_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bench]\nconcurrency = 0").unwrap();
        let path = file.path().to_str().unwrap();

        assert!(matches!(Config::load(Some(path)), Err(Error::Config(_))));

        let mut config = Config::read_with(Some(path), |key| {
            (key == "QW_BALANCER").then(|| "id".to_string())
        })
        .unwrap();
        assert_eq!(config.bench.concurrency, 0);
        assert_eq!(config.bench.balancer, BalancerKind::Id);

        config.bench.concurrency = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_value_is_checked_only_after_every_layer() {
        let mut config =
            Config::read_with(None, |key| (key == "QW_CONCURRENCY").then(|| "0".to_string()))
                .unwrap();
        assert!(config.validate().is_err());

        config.bench.concurrency = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn durations_parse() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("12"), Ok(Duration::from_secs(12)));
        assert!(parse_duration("soon").is_err());
    }
}
