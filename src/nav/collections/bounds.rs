use super::double_ended::{DoubleEndedHeap, Removal};
use crate::nav::coord::{CellRect, Coord};

/// Running min/max of x and y over a multiset of coordinates.
///
/// Each axis is projected into its own [`DoubleEndedHeap`], so adding or
/// removing a coordinate costs O(log n) and reading the bounds costs O(1).
/// Duplicate coordinates are counted; removing one copy leaves the bounds
/// alone while another copy remains.
#[derive(Debug, Clone, Default)]
pub struct BoundsTracker {
    xs: DoubleEndedHeap<i32>,
    ys: DoubleEndedHeap<i32>,
}

/// Outcome of [`BoundsTracker::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsRemoval {
    /// The coordinate was never added (or already fully removed).
    NotTracked,
    Removed,
}

impl BoundsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, c: Coord) {
        self.xs.insert(c.x);
        self.ys.insert(c.y);
    }

    /// Removes one occurrence of `c`.
    ///
    /// Callers must only remove coordinates they added; the tracker stores
    /// axis projections, so it cannot tell `(1, 2)` + `(3, 4)` apart from
    /// `(1, 4)` + `(3, 2)`. A removal whose x or y was never added is rejected
    /// without touching either axis.
    pub fn remove(&mut self, c: Coord) -> BoundsRemoval {
        if self.xs.count(&c.x) == 0 || self.ys.count(&c.y) == 0 {
            return BoundsRemoval::NotTracked;
        }
        let x = self.xs.remove(&c.x);
        let y = self.ys.remove(&c.y);
        debug_assert!(x != Removal::Absent && y != Removal::Absent);
        BoundsRemoval::Removed
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Number of coordinates tracked, counting duplicates.
    pub fn len(&self) -> usize {
        self.xs.total()
    }

    pub fn min_bound(&self) -> Option<Coord> {
        Some(Coord::new(self.xs.min()?, self.ys.min()?))
    }

    pub fn max_bound(&self) -> Option<Coord> {
        Some(Coord::new(self.xs.max()?, self.ys.max()?))
    }

    pub fn bounds(&self) -> Option<CellRect> {
        Some(CellRect {
            min: self.min_bound()?,
            max: self.max_bound()?,
        })
    }

    pub fn clear(&mut self) {
        self.xs.clear();
        self.ys.clear();
    }
}
