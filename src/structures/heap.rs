//! Generic binary heap with a compile-time ordering
//!
//! The ordering is a zero-sized type parameter, so a max-heap is simply
//! `Heap<T, MaxFirst>` and works for any `PartialOrd` element, including
//! types that cannot be negated (durations, strings).

use std::marker::PhantomData;

/// Decides which of two elements belongs closer to the top of the heap
pub trait HeapOrder<T> {
    /// True when `a` must be popped before `b`
    fn precedes(a: &T, b: &T) -> bool;
}

/// Smallest element on top
#[derive(Debug, Clone, Copy, Default)]
pub struct MinFirst;

/// Largest element on top
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFirst;

impl<T: PartialOrd> HeapOrder<T> for MinFirst {
    #[inline]
    fn precedes(a: &T, b: &T) -> bool {
        a < b
    }
}

impl<T: PartialOrd> HeapOrder<T> for MaxFirst {
    #[inline]
    fn precedes(a: &T, b: &T) -> bool {
        a > b
    }
}

/// Array-backed binary heap
#[derive(Debug, Clone)]
pub struct Heap<T, O = MinFirst> {
    items: Vec<T>,
    _order: PhantomData<O>,
}

impl<T, O: HeapOrder<T>> Default for Heap<T, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O: HeapOrder<T>> Heap<T, O> {
    /// Create an empty heap
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _order: PhantomData,
        }
    }

    /// Create an empty heap with room for `capacity` elements
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            _order: PhantomData,
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the heap holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Top element without removing it
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Insert an element in O(log n)
    pub fn push(&mut self, value: T) {
        self.items.push(value);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the top element in O(log n)
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        top
    }

    /// Consume the heap, returning elements in pop order
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(v) = self.pop() {
            out.push(v);
        }
        out
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !O::precedes(&self.items[idx], &self.items[parent]) {
                break;
            }
            self.items.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut top = idx;

            if left < len && O::precedes(&self.items[left], &self.items[top]) {
                top = left;
            }
            if right < len && O::precedes(&self.items[right], &self.items[top]) {
                top = right;
            }
            if top == idx {
                break;
            }
            self.items.swap(idx, top);
            idx = top;
        }
    }
}

impl<T, O: HeapOrder<T>> FromIterator<T> for Heap<T, O> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut heap = Self::new();
        for v in iter {
            heap.push(v);
        }
        heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn push_updates_len_and_top() {
        let mut h: Heap<i32> = Heap::new();
        h.push(4);
        h.push(5);
        h.push(6);
        assert_eq!(h.len(), 3);
        assert_eq!(h.peek(), Some(&4));
    }

    #[test]
    fn pop_returns_ascending_order() {
        let h: Heap<i32> = [5, 4, 3, 2, 1].into_iter().collect();
        assert_eq!(h.peek(), Some(&1));
        assert_eq!(h.into_sorted_vec(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn max_first_pops_descending() {
        let mut h: Heap<f32, MaxFirst> = Heap::new();
        for v in [1.5, 3.5, 2.5] {
            h.push(v);
        }
        assert_eq!(h.pop(), Some(3.5));
        assert_eq!(h.pop(), Some(2.5));
        assert_eq!(h.len(), 1);
        assert_eq!(h.peek(), Some(&1.5));
    }

    #[test]
    fn empty_heap_yields_none() {
        let mut h: Heap<u64> = Heap::with_capacity(4);
        assert!(h.is_empty());
        assert_eq!(h.peek(), None);
        assert_eq!(h.pop(), None);
    }

    #[test]
    fn strings_and_durations_are_supported() {
        let words: Heap<String> = ["pear", "apple", "fig"].iter().map(|s| s.to_string()).collect();
        assert_eq!(words.into_sorted_vec(), vec!["apple", "fig", "pear"]);

        let mut times: Heap<Duration, MaxFirst> = Heap::new();
        times.push(Duration::from_millis(3));
        times.push(Duration::from_millis(9));
        times.push(Duration::from_millis(1));
        assert_eq!(times.peek(), Some(&Duration::from_millis(9)));
    }

    #[test]
    fn duplicates_are_kept() {
        let h: Heap<i32> = [2, 2, 1, 2, 1].into_iter().collect();
        assert_eq!(h.into_sorted_vec(), vec![1, 1, 2, 2, 2]);
    }
}
