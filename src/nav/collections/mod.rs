//! Ordered collections backing the bounds tracker.
//!
//! # Example
//!
//! ```rust
//! use lodestar::nav::collections::BoundsTracker;
//! use lodestar::nav::coord::Coord;
//!
//! let mut bounds = BoundsTracker::new();
//! bounds.add(Coord::new(1, 1));
//! bounds.add(Coord::new(1, 1));
//! bounds.add(Coord::new(-2, 3));
//! assert_eq!(bounds.min_bound(), Some(Coord::new(-2, 1)));
//! assert_eq!(bounds.max_bound(), Some(Coord::new(1, 3)));
//!
//! // One copy of (1, 1) is still tracked.
//! bounds.remove(Coord::new(1, 1));
//! assert_eq!(bounds.max_bound(), Some(Coord::new(1, 3)));
//! ```

pub mod bounds;
pub mod double_ended;
pub mod indexed_heap;


pub use bounds::{BoundsRemoval, BoundsTracker};
pub use double_ended::{DoubleEndedHeap, Removal};
pub use indexed_heap::{HeapOrder, IndexedHeap, MaxFirst, MinFirst};
