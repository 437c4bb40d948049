//! Streaming median over an unbounded sequence of values

use crate::stats::Sample;
use crate::structures::{Heap, MaxFirst, MinFirst};

/// The middle of the values seen so far
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MedianValues<T> {
    /// Nothing has been pushed
    Empty,
    /// Odd count: the middle value
    Single(T),
    /// Even count: the two middle values, lower first
    Pair(T, T),
}

impl<T: Copy> MedianValues<T> {
    /// Middle values as a vector of zero, one or two elements
    pub fn to_vec(self) -> Vec<T> {
        match self {
            MedianValues::Empty => Vec::new(),
            MedianValues::Single(v) => vec![v],
            MedianValues::Pair(lo, hi) => vec![lo, hi],
        }
    }
}

/// Tracks the median of a value stream with two heaps.
///
/// `low` holds the smaller half with its maximum on top, `high` the larger
/// half with its minimum on top. `low` is never smaller than `high` and never
/// more than one element larger.
#[derive(Debug, Clone)]
pub struct StreamingMedian<T> {
    low: Heap<T, MaxFirst>,
    high: Heap<T, MinFirst>,
}

impl<T: PartialOrd + Copy> Default for StreamingMedian<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialOrd + Copy> StreamingMedian<T> {
    /// Create an empty median tracker
    pub fn new() -> Self {
        Self {
            low: Heap::new(),
            high: Heap::new(),
        }
    }

    /// Number of values pushed
    pub fn len(&self) -> usize {
        self.low.len() + self.high.len()
    }

    /// True when no value has been pushed
    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    /// Add a value to the set.
    pub fn push(&mut self, x: T) {
        self.low.push(x);

        // The largest of the low half moves up, keeping low <= high.
        if let Some(top) = self.low.pop() {
            self.high.push(top);
        }

        if self.high.len() > self.low.len() {
            if let Some(min) = self.high.pop() {
                self.low.push(min);
            }
        }
    }

    /// The middle value, or the two middle values when the count is even.
    pub fn median_values(&self) -> MedianValues<T> {
        match (self.low.peek(), self.high.peek()) {
            (None, _) => MedianValues::Empty,
            (Some(&lo), Some(&hi)) if self.low.len() == self.high.len() => {
                MedianValues::Pair(lo, hi)
            }
            (Some(&lo), _) => MedianValues::Single(lo),
        }
    }
}

impl<T: Sample> StreamingMedian<T> {
    /// Median of the set; 0 when empty, the mean of the middle pair when even.
    pub fn median(&self) -> f64 {
        match self.median_values() {
            MedianValues::Empty => 0.0,
            MedianValues::Single(v) => v.to_f64(),
            MedianValues::Pair(lo, hi) => (lo.to_f64() + hi.to_f64()) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn raw_median_after_each_push() {
        let steps: [(i32, &[i32]); 6] = [
            (-1, &[-1]),
            (9, &[-1, 9]),
            (2, &[2]),
            (8, &[2, 8]),
            (3, &[3]),
            (7, &[3, 7]),
        ];

        let mut m = StreamingMedian::new();
        for (i, (push, expect)) in steps.iter().enumerate() {
            m.push(*push);
            assert_eq!(m.median_values().to_vec(), expect.to_vec(), "step {} failed", i);
        }
        assert_eq!(m.median(), 5.0);
    }

    #[test]
    fn empty_median_is_zero() {
        let m: StreamingMedian<f64> = StreamingMedian::new();
        assert_eq!(m.median_values(), MedianValues::Empty);
        assert_eq!(m.median(), 0.0);
        assert!(m.is_empty());
    }

    #[test]
    fn durations_average_the_middle_pair() {
        let mut m = StreamingMedian::new();
        m.push(Duration::from_millis(10));
        m.push(Duration::from_millis(20));
        assert_eq!(
            m.median_values(),
            MedianValues::Pair(Duration::from_millis(10), Duration::from_millis(20))
        );
        assert!((m.median() - 0.015).abs() < 1e-12);
    }

    fn reference_median(values: &[i64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        }
    }

    proptest! {
        #[test]
        fn median_matches_sorted_reference(values in prop::collection::vec(-50i64..50, 1..200)) {
            let mut m = StreamingMedian::new();
            for &v in &values {
                m.push(v);
            }
            prop_assert_eq!(m.len(), values.len());
            prop_assert_eq!(m.median(), reference_median(&values));
        }

        #[test]
        fn halves_stay_balanced(values in prop::collection::vec(any::<u32>(), 0..100)) {
            let mut m = StreamingMedian::new();
            for &v in &values {
                m.push(v);
                prop_assert!(m.low.len() >= m.high.len());
                prop_assert!(m.low.len() - m.high.len() <= 1);
                if let (Some(lo), Some(hi)) = (m.low.peek(), m.high.peek()) {
                    prop_assert!(lo <= hi);
                }
            }
        }
    }
}
