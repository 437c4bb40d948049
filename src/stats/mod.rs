//! Online statistics: streaming median, per-metric aggregators and the
//! global / per-worker benchmark view built on them.

pub mod sample;
pub mod median;
pub mod aggregator;
pub mod benchmark;

pub use sample::Sample;
pub use median::{MedianValues, StreamingMedian};
pub use aggregator::{Aggregator, Summary};
pub use benchmark::{BenchmarkSnapshot, BenchmarkStats, MetricPair, PairSummary, SnapshotReport};
