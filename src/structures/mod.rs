//! Core reusable data structures

pub mod heap;

// Export the main types
pub use heap::{Heap, HeapOrder, MaxFirst, MinFirst};
