//! Query parameter files
//!
//! Records are `hostname,start_time,end_time` with timestamps in
//! [`TIME_FORMAT`]. A header row whose first field is `hostname` is skipped.

use crate::core::error::InputError;
use crate::core::types::{QuerySpec, TIME_FORMAT};
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::io::Read;

/// Read every query from `reader`, giving each one `bucket_size`.
pub fn read_queries<R: Read>(reader: R, bucket_size: &str) -> Result<Vec<QuerySpec>, InputError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut queries = Vec::new();
    let mut record = StringRecord::new();
    while csv.read_record(&mut record)? {
        if record.get(0) == Some("hostname") {
            continue;
        }
        queries.push(parse_record(&record, bucket_size)?);
    }
    Ok(queries)
}

fn parse_record(record: &StringRecord, bucket_size: &str) -> Result<QuerySpec, InputError> {
    let line = record.position().map_or(0, |p| p.line());
    let field = |index: usize, name: &'static str| {
        record
            .get(index)
            .ok_or(InputError::MissingField { field: name, line })
    };

    let timestamp = |index: usize, name: &'static str| -> Result<NaiveDateTime, InputError> {
        let raw = field(index, name)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|source| {
            InputError::Timestamp {
                field: name,
                line,
                column: column_of(record, index),
                source,
            }
        })
    };

    Ok(QuerySpec {
        bucket_size: bucket_size.to_string(),
        hostname: field(0, "hostname")?.to_string(),
        start_time: timestamp(1, "start_time")?,
        end_time: timestamp(2, "end_time")?,
    })
}

/// 1-based column where field `index` starts, assuming unquoted fields
fn column_of(record: &StringRecord, index: usize) -> usize {
    record.iter().take(index).map(|f| f.chars().count() + 1).sum::<usize>() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::parse_host_id;

    const SAMPLE: &str = "\
hostname,start_time,end_time
host_000008,2017-01-01 08:59:22,2017-01-01 09:59:22
host_000001,2017-01-02 13:02:02,2017-01-02 14:02:02
host_000008,2017-01-02 18:50:28,2017-01-02 19:50:28
";

    #[test]
    fn reads_records_and_skips_header() {
        let queries = read_queries(SAMPLE.as_bytes(), "1m").unwrap();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1].hostname, "host_000001");
        assert_eq!(queries[1].to_string(), "host_000001, 2017-01-02 13:02:02, 2017-01-02 14:02:02");
        assert!(queries.iter().all(|q| q.bucket_size == "1m"));
        assert!(queries.iter().all(|q| parse_host_id(&q.hostname).is_ok()));
        assert_eq!(queries[0].max_buckets(), 60);
    }

    #[test]
    fn header_is_optional() {
        let body = SAMPLE.lines().skip(1).collect::<Vec<_>>().join("\n");
        assert_eq!(read_queries(body.as_bytes(), "5m").unwrap().len(), 3);
    }

    #[test]
    fn empty_input_yields_no_queries() {
        assert!(read_queries("".as_bytes(), "1m").unwrap().is_empty());
        assert!(read_queries("hostname,start_time,end_time\n".as_bytes(), "1m")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn bad_timestamp_reports_position() {
        let data = "host_000001,2017-01-01 08:59:22,2017-01-01 09:59:22\n\
                    host_000002,2017-01-01 08:59:22,yesterday\n";
        match read_queries(data.as_bytes(), "1m") {
            Err(InputError::Timestamp { field, line, column, .. }) => {
                assert_eq!(field, "end_time");
                assert_eq!(line, 2);
                assert_eq!(column, 33);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn short_record_is_rejected() {
        let err = read_queries("host_000001,2017-01-01 08:59:22\n".as_bytes(), "1m").unwrap_err();
        assert!(matches!(err, InputError::MissingField { field: "end_time", line: 1 }));
    }
}
