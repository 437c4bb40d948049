//! Running statistics for one metric over one scope

use crate::stats::{Sample, StreamingMedian};
use serde::Serialize;

/// Point-in-time view of an [`Aggregator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary<T> {
    /// Number of values pushed
    pub count: usize,
    /// Sum of all values
    pub total: T,
    /// Smallest value (zero when empty)
    pub min: T,
    /// Largest value (zero when empty)
    pub max: T,
    /// total / count
    pub mean: f64,
    /// Median of all values
    pub median: f64,
}

impl<T: Sample> Summary<T> {
    /// Summary of an empty stream
    pub fn empty() -> Self {
        Self {
            count: 0,
            total: T::zero(),
            min: T::zero(),
            max: T::zero(),
            mean: 0.0,
            median: 0.0,
        }
    }

    /// Convert the value fields with `f`, keeping count, mean and median.
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Summary<U> {
        Summary {
            count: self.count,
            total: f(self.total),
            min: f(self.min),
            max: f(self.max),
            mean: self.mean,
            median: self.median,
        }
    }
}

/// Continuously tracks the count, total, minimum, maximum, mean and median
/// of the values pushed into it. Write-once per value; nothing is ever removed.
#[derive(Debug, Clone)]
pub struct Aggregator<T> {
    count: usize,
    total: T,
    min: T,
    max: T,
    mean: f64,
    median: StreamingMedian<T>,
}

impl<T: Sample> Default for Aggregator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> Aggregator<T> {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self {
            count: 0,
            total: T::zero(),
            min: T::zero(),
            max: T::zero(),
            mean: 0.0,
            median: StreamingMedian::new(),
        }
    }

    /// Record one value
    pub fn push(&mut self, x: T) {
        if self.count == 0 || x < self.min {
            self.min = x;
        }
        if self.count == 0 || x > self.max {
            self.max = x;
        }

        self.total = self.total.add(x);
        self.count += 1;
        self.mean = self.total.to_f64() / self.count as f64;

        self.median.push(x);
    }

    /// Number of values pushed
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of all values
    pub fn total(&self) -> T {
        self.total
    }

    /// Smallest value, zero when empty
    pub fn min(&self) -> T {
        self.min
    }

    /// Largest value, zero when empty
    pub fn max(&self) -> T {
        self.max
    }

    /// Arithmetic mean, zero when empty
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Median of all values, zero when empty
    pub fn median(&self) -> f64 {
        self.median.median()
    }

    /// Snapshot of every field
    pub fn summary(&self) -> Summary<T> {
        Summary {
            count: self.count,
            total: self.total,
            min: self.min,
            max: self.max,
            mean: self.mean,
            median: self.median(),
        }
    }
}
