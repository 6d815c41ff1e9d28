//! Integer grid coordinates, inclusive cell rectangles and distance metrics.

use bevy::prelude::IVec2;
use serde::{Deserialize, Serialize};

/// Identity of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const ZERO: Coord = Coord { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn axis(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// One cell along the straight line toward `target` (8-connected).
    /// Returns `self` when already there.
    pub fn step_toward(self, target: Coord) -> Coord {
        Coord::new(
            self.x.saturating_add(target.x.cmp(&self.x) as i32),
            self.y.saturating_add(target.y.cmp(&self.y) as i32),
        )
    }

    /// Saturates at the edges of the `i32` plane.
    pub fn offset(self, dx: i32, dy: i32) -> Coord {
        Coord::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<IVec2> for Coord {
    fn from(v: IVec2) -> Self {
        Coord::new(v.x, v.y)
    }
}

impl From<Coord> for IVec2 {
    fn from(c: Coord) -> Self {
        IVec2::new(c.x, c.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Coord::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn next(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Axis-aligned rectangle of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub min: Coord,
    pub max: Coord,
}

impl CellRect {
    /// Builds a rectangle from two corners in any order.
    pub fn new(a: Coord, b: Coord) -> Self {
        Self {
            min: Coord::new(a.x.min(b.x), a.y.min(b.y)),
            max: Coord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn point(c: Coord) -> Self {
        Self { min: c, max: c }
    }

    pub fn contains(&self, c: Coord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    pub fn width(&self) -> usize {
        (self.max.x as i64 - self.min.x as i64 + 1) as usize
    }

    pub fn height(&self) -> usize {
        (self.max.y as i64 - self.min.y as i64 + 1) as usize
    }

    pub fn area(&self) -> usize {
        self.width().saturating_mul(self.height())
    }

    /// Grows the rectangle to cover `c`.
    pub fn include(&mut self, c: Coord) {
        self.min.x = self.min.x.min(c.x);
        self.min.y = self.min.y.min(c.y);
        self.max.x = self.max.x.max(c.x);
        self.max.y = self.max.y.max(c.y);
    }

    /// Expands every side by `amount` cells, clamped to the `i32` plane.
    pub fn padded(&self, amount: i32) -> Self {
        let amount = amount.max(0);
        Self {
            min: self.min.offset(-amount, -amount),
            max: self.max.offset(amount, amount),
        }
    }

    /// Splits along `axis` at `split`. Both halves keep the split line
    /// because a k-d node may have equal keys on either side.
    pub(crate) fn split(&self, axis: Axis, split: i32) -> (CellRect, CellRect) {
        let mut low = *self;
        let mut high = *self;
        match axis {
            Axis::X => {
                low.max.x = split.min(self.max.x);
                high.min.x = split.max(self.min.x);
            }
            Axis::Y => {
                low.max.y = split.min(self.max.y);
                high.min.y = split.max(self.min.y);
            }
        }
        (low, high)
    }

    /// Flattens a contained coordinate to a row-major index.
    pub fn index_of(&self, c: Coord) -> Option<usize> {
        if !self.contains(c) {
            return None;
        }
        let col = (c.x as i64 - self.min.x as i64) as usize;
        let row = (c.y as i64 - self.min.y as i64) as usize;
        Some(row * self.width() + col)
    }

    pub fn coord_of(&self, index: usize) -> Coord {
        let width = self.width();
        Coord::new(
            self.min.x + (index % width) as i32,
            self.min.y + (index / width) as i32,
        )
    }
}

/// Distance metric used by nearest-neighbour visits.
///
/// Distances are integers in metric units: Manhattan reports `|dx| + |dy|`,
/// Euclidean reports the *squared* length so that no square root is needed
/// for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
}

impl Metric {
    fn combine(self, dx: u64, dy: u64) -> u64 {
        match self {
            Metric::Euclidean => dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)),
            Metric::Manhattan => dx.saturating_add(dy),
        }
    }

    pub fn distance(self, a: Coord, b: Coord) -> u64 {
        let dx = (a.x as i64 - b.x as i64).unsigned_abs();
        let dy = (a.y as i64 - b.y as i64).unsigned_abs();
        self.combine(dx, dy)
    }

    /// Smallest distance from `origin` to any cell of `rect`.
    pub fn distance_to_rect(self, origin: Coord, rect: &CellRect) -> u64 {
        let gap = |v: i32, lo: i32, hi: i32| -> u64 {
            if v < lo {
                (lo as i64 - v as i64) as u64
            } else if v > hi {
                (v as i64 - hi as i64) as u64
            } else {
                0
            }
        };
        self.combine(
            gap(origin.x, rect.min.x, rect.max.x),
            gap(origin.y, rect.min.y, rect.max.y),
        )
    }

    /// Converts a cell-count radius into this metric's units.
    pub fn limit(self, max_distance: u32) -> u64 {
        let d = max_distance as u64;
        match self {
            Metric::Euclidean => d * d,
            Metric::Manhattan => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_index_round_trips_corners() {
        let rect = CellRect::new(Coord::new(-3, 2), Coord::new(4, 6));
        assert_eq!(rect.width(), 8);
        assert_eq!(rect.height(), 5);
        assert_eq!(rect.index_of(Coord::new(-3, 2)), Some(0));
        assert_eq!(rect.index_of(Coord::new(4, 6)), Some(rect.area() - 1));
        assert_eq!(rect.coord_of(rect.area() - 1), Coord::new(4, 6));
        assert_eq!(rect.index_of(Coord::new(5, 6)), None);
    }

    #[test]
    fn test_metric_rect_distance_is_zero_inside() {
        let rect = CellRect::new(Coord::new(0, 0), Coord::new(10, 10));
        assert_eq!(Metric::Manhattan.distance_to_rect(Coord::new(5, 5), &rect), 0);
        assert_eq!(Metric::Manhattan.distance_to_rect(Coord::new(-2, 13), &rect), 5);
        assert_eq!(Metric::Euclidean.distance_to_rect(Coord::new(-2, 13), &rect), 13);
    }

    #[test]
    fn test_step_toward_moves_one_cell_diagonally() {
        let from = Coord::new(0, 0);
        assert_eq!(from.step_toward(Coord::new(5, -3)), Coord::new(1, -1));
        assert_eq!(from.step_toward(Coord::new(0, 7)), Coord::new(0, 1));
        assert_eq!(from.step_toward(from), from);
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        let corner = Coord::new(i32::MAX, i32::MIN);
        assert_eq!(corner.offset(5, -5), corner);
        assert_eq!(corner.step_toward(Coord::new(i32::MAX, i32::MIN)), corner);
        assert_eq!(Coord::new(i32::MIN, 0).step_toward(Coord::new(i32::MAX, 0)), Coord::new(i32::MIN + 1, 0));

        let rect = CellRect::point(corner).padded(10);
        assert_eq!(rect.max.x, i32::MAX);
        assert_eq!(rect.min.y, i32::MIN);
        assert_eq!(rect.min.x, i32::MAX - 10);

        let far = Metric::Euclidean.distance(Coord::new(i32::MIN, i32::MIN), Coord::new(i32::MAX, i32::MAX));
        assert_eq!(far, u64::MAX);
        let span = u32::MAX as u64;
        assert_eq!(Metric::Manhattan.distance(Coord::new(i32::MIN, i32::MIN), Coord::new(i32::MAX, i32::MAX)), span * 2);
        assert_eq!(CellRect::new(Coord::new(i32::MIN, i32::MIN), Coord::new(i32::MAX, i32::MAX)).area(), usize::MAX);
    }
}
