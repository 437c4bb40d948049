//! Human and machine readable benchmark reports

use crate::core::config::ReportFormat;
use crate::core::error::{Error, Result};
use crate::core::types::{ExecutionResult, QuerySpec};
use crate::stats::{BenchmarkSnapshot, Summary};
use std::time::Duration;

const HEADER: &str = "| Worker | Queries | Total | Minimum | Maximum | Average |  Median |\n\
                      |--------|---------|-------|---------|---------|---------|---------|\n";

const MICROSECOND: Duration = Duration::from_micros(1);
const MILLISECOND: Duration = Duration::from_millis(1);

/// One line per executed query, printed while the run is in progress
pub fn result_line(result: &ExecutionResult<QuerySpec>) -> String {
    match &result.outcome {
        Ok(stats) => format!(
            "✅ {} -> {}, worker {}",
            result.item,
            format_duration(round_duration(stats.latency, MICROSECOND)),
            result.worker
        ),
        Err(e) => format!("❌ {}: {}", result.item, e),
    }
}

/// Execution time table: one `ALL` row, then one row per worker
pub fn latency_table(snapshot: &BenchmarkSnapshot) -> String {
    let mut table = String::from(HEADER);
    table.push_str(&latency_row("ALL", &snapshot.global.latency));
    for (worker, pair) in snapshot.workers.iter().enumerate() {
        table.push_str(&latency_row(&worker.to_string(), &pair.latency));
    }
    table
}

/// Planner cost table, truncated to whole units
pub fn cost_table(snapshot: &BenchmarkSnapshot) -> String {
    let mut table = String::from(HEADER);
    table.push_str(&cost_row("ALL", &snapshot.global.cost));
    for (worker, pair) in snapshot.workers.iter().enumerate() {
        table.push_str(&cost_row(&worker.to_string(), &pair.cost));
    }
    table
}

/// Snapshot as pretty-printed JSON, latencies in milliseconds
pub fn json(snapshot: &BenchmarkSnapshot) -> Result<String> {
    serde_json::to_string_pretty(&snapshot.to_report())
        .map_err(|e| Error::internal(format!("Failed to serialize report: {}", e)))
}

/// Full report in the requested format
pub fn render(snapshot: &BenchmarkSnapshot, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => json(snapshot),
        ReportFormat::Table => {
            let mut out = String::new();
            let failed: usize = snapshot.failed.iter().sum();
            if failed > 0 {
                out.push_str(&format!("Failed queries: {}\n\n", failed));
            }
            out.push_str(&format!("Execution time:\n\n{}\n", latency_table(snapshot)));
            out.push_str(&format!("Execution cost:\n\n{}\n", cost_table(snapshot)));
            Ok(out)
        }
    }
}

fn latency_row(worker: &str, s: &Summary<Duration>) -> String {
    let us = |d: Duration| format_duration(round_duration(d, MICROSECOND));
    let seconds = |v: f64| Duration::try_from_secs_f64(v).unwrap_or_default();
    format!(
        "| {:>6} | {:>7} | {:>5} | {:>7} | {:>7} | {:>7} | {:>7} |\n",
        worker,
        s.count,
        format_duration(round_duration(s.total, MILLISECOND)),
        us(s.min),
        us(s.max),
        us(seconds(s.mean)),
        us(seconds(s.median)),
    )
}

fn cost_row(worker: &str, s: &Summary<f64>) -> String {
    format!(
        "| {:>6} | {:>7} | {:>5} | {:>7} | {:>7} | {:>7} | {:>7} |\n",
        worker,
        s.count,
        s.total as i64,
        s.min as i64,
        s.max as i64,
        s.mean as i64,
        s.median as i64,
    )
}

/// Round `d` to the nearest multiple of `unit`, halves away from zero
pub fn round_duration(d: Duration, unit: Duration) -> Duration {
    let unit_ns = unit.as_nanos();
    if unit_ns <= 1 {
        return d;
    }
    let ns = d.as_nanos();
    let rounded = (ns + unit_ns / 2) / unit_ns * unit_ns;
    Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}

/// Compact duration text: "0s", "850ns", "12.5µs", "3.25ms", "1m4.5s", "2h0m0s"
pub fn format_duration(d: Duration) -> String {
    let ns = d.as_nanos();
    if ns == 0 {
        return "0s".to_string();
    }
    if ns < 1_000 {
        return format!("{}ns", ns);
    }
    if ns < 1_000_000 {
        return format!("{}µs", decimal(ns, 1_000));
    }
    if ns < 1_000_000_000 {
        return format!("{}ms", decimal(ns, 1_000_000));
    }

    let total_secs = d.as_secs();
    let (hours, minutes) = (total_secs / 3600, (total_secs / 60) % 60);
    let seconds = decimal(ns % 60_000_000_000, 1_000_000_000);
    match (hours, minutes) {
        (0, 0) => format!("{}s", seconds),
        (0, m) => format!("{}m{}s", m, seconds),
        (h, m) => format!("{}h{}m{}s", h, m, seconds),
    }
}

/// `value / unit` with trailing zeros of the fraction dropped
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExecutionError;
    use crate::core::types::{QueryStats, TIME_FORMAT};
    use crate::stats::{BenchmarkStats, PairSummary};
    use chrono::NaiveDateTime;

    fn query() -> QuerySpec {
        let ts = |s| NaiveDateTime::parse_from_str(s, TIME_FORMAT).unwrap();
        QuerySpec {
            bucket_size: "1m".to_string(),
            hostname: "host_000008".to_string(),
            start_time: ts("2017-01-01 08:59:22"),
            end_time: ts("2017-01-01 09:59:22"),
        }
    }

    fn ok(worker: usize, micros: u64, cost: f64) -> ExecutionResult<QuerySpec> {
        ExecutionResult {
            item: query(),
            outcome: Ok(QueryStats {
                latency: Duration::from_micros(micros),
                cost,
            }),
            worker,
        }
    }

    #[test]
    fn durations_format_like_clock_units() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(850)), "850ns");
        assert_eq!(format_duration(Duration::from_nanos(12_500)), "12.5µs");
        assert_eq!(format_duration(Duration::from_micros(3_250)), "3.25ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(64_500)), "1m4.5s");
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2h0m0s");
    }

    #[test]
    fn rounding_goes_to_nearest_unit() {
        assert_eq!(round_duration(Duration::from_nanos(1_499), MICROSECOND), MICROSECOND);
        assert_eq!(round_duration(Duration::from_nanos(1_500), MICROSECOND), Duration::from_micros(2));
        assert_eq!(round_duration(Duration::from_micros(2_600), MILLISECOND), Duration::from_millis(3));
        assert_eq!(round_duration(Duration::from_nanos(7), Duration::from_nanos(1)), Duration::from_nanos(7));
    }

    #[test]
    fn result_lines_show_outcome() {
        let line = result_line(&ok(2, 1_234, 10.0));
        assert_eq!(line, "✅ host_000008, 2017-01-01 08:59:22, 2017-01-01 09:59:22 -> 1.234ms, worker 2");

        let failed = ExecutionResult {
            item: query(),
            outcome: Err(ExecutionError::Query("relation \"cpu_usage\" does not exist".into())),
            worker: 0,
        };
        assert_eq!(
            result_line(&failed),
            "❌ host_000008, 2017-01-01 08:59:22, 2017-01-01 09:59:22: query: relation \"cpu_usage\" does not exist"
        );
    }

    #[test]
    fn tables_have_all_row_and_one_row_per_worker() {
        let mut stats = BenchmarkStats::new(2);
        stats.push(&ok(0, 2_000, 100.9));
        stats.push(&ok(0, 4_000, 300.2));
        let snapshot = stats.snapshot();

        let latency = latency_table(&snapshot);
        let lines: Vec<&str> = latency.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "|    ALL |       2 |   6ms |     2ms |     4ms |     3ms |     3ms |");
        assert_eq!(lines[4], "|      1 |       0 |    0s |      0s |      0s |      0s |      0s |");

        let cost = cost_table(&snapshot);
        let lines: Vec<&str> = cost.lines().collect();
        assert_eq!(lines[3], "|      0 |       2 |   401 |     100 |     300 |     200 |     200 |");
    }

    #[test]
    fn json_report_lists_scopes() {
        let snapshot = BenchmarkSnapshot {
            global: PairSummary {
                latency: Summary::empty(),
                cost: Summary::empty(),
            },
            workers: vec![],
            failed: vec![],
        };
        let text = json(&snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["latency_ms"][0]["worker"], "ALL");
        assert_eq!(value["cost"][0]["count"], 0);
    }

    #[test]
    fn table_report_mentions_failures() {
        let mut stats = BenchmarkStats::new(1);
        stats.push(&ExecutionResult {
            item: query(),
            outcome: Err(ExecutionError::Cancelled),
            worker: 0,
        });
        let text = render(&stats.snapshot(), ReportFormat::Table).unwrap();
        assert!(text.starts_with("Failed queries: 1"));
        assert!(text.contains("Execution time:"));
        assert!(text.contains("Execution cost:"));
    }

    #[test]
    fn table_report_stacks_both_tables() {
        let mut stats = BenchmarkStats::new(1);
        stats.push(&ok(0, 1_500, 42.0));
        let snapshot = stats.snapshot();

        let text = render(&snapshot, ReportFormat::Table).unwrap();
        let expected = format!(
            "Execution time:\n\n{}\nExecution cost:\n\n{}\n",
            latency_table(&snapshot),
            cost_table(&snapshot)
        );
        assert_eq!(text, expected);
        assert!(latency_table(&snapshot).ends_with("|\n"));
    }
}
