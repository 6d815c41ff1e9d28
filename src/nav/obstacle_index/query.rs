use bevy::prelude::*;

use super::ObstacleIndex;
use crate::nav::coord::{CellRect, Coord};
use crate::nav::grid::{Obstacle, ObstacleGrid};

/// Result of one pass over the nearest candidates.
enum Visit {
    Healthy(Vec<Coord>),
    /// Too many stale candidates; carries what was found.
    Degraded(Vec<Coord>),
}

impl ObstacleIndex {
    /// Up to `k` indexed obstacles within `max_distance` of `origin`, nearest
    /// first under the configured metric.
    ///
    /// Candidates that are tombstoned, or whose grid cell is empty or no longer
    /// passes the filter, are skipped as stale. If the stale share of visited
    /// candidates reaches `invalid_ratio`, the index rebuilds once and the
    /// query is retried. The retry's answer is returned whatever its health.
    pub fn query_k_nearest(
        &mut self,
        grid: &ObstacleGrid,
        origin: Coord,
        k: usize,
        max_distance: u32,
    ) -> Vec<Coord> {
        if k == 0 {
            return Vec::new();
        }
        if self.tree.is_none() && !grid.is_empty() {
            self.rebuild(grid);
        }

        match self.visit_nearest(grid, origin, k, max_distance) {
            Visit::Healthy(found) => found,
            Visit::Degraded(_) => {
                debug!(
                    "[OBSTACLE_INDEX] Query at {:?} degraded ({} tombstones), rebuilding",
                    origin,
                    self.invalid.len()
                );
                self.rebuild(grid);
                match self.visit_nearest(grid, origin, k, max_distance) {
                    Visit::Healthy(found) | Visit::Degraded(found) => found,
                }
            }
        }
    }

    fn visit_nearest(&self, grid: &ObstacleGrid, origin: Coord, k: usize, max_distance: u32) -> Visit {
        let Some(tree) = &self.tree else {
            return Visit::Healthy(Vec::new());
        };

        let metric = self.config.metric;
        let mut found = Vec::with_capacity(k);
        let mut candidates = 0usize;
        let mut invalid_hits = 0usize;

        for neighbor in tree.nearest(origin, metric, metric.limit(max_distance)) {
            candidates += 1;
            if self.invalid.contains(&neighbor.coord) {
                invalid_hits += 1;
                continue;
            }
            if !self.matches(grid, neighbor.coord) {
                // Grid changed without the index being told.
                debug!("[OBSTACLE_INDEX] {:?} indexed but stale in the grid, skipped", neighbor.coord);
                invalid_hits += 1;
                continue;
            }
            found.push(neighbor.coord);
            if found.len() == k {
                break;
            }
        }

        let degraded = invalid_hits > 0
            && invalid_hits as f32 / candidates as f32 >= self.config.invalid_ratio;
        if degraded {
            Visit::Degraded(found)
        } else {
            Visit::Healthy(found)
        }
    }

    /// Indexed, non-tombstoned coordinates inside `rect` (inclusive).
    pub fn query_range(&self, rect: CellRect) -> Vec<Coord> {
        let mut found = Vec::new();
        if let Some(tree) = &self.tree {
            tree.for_each_in_range(rect, |c, ()| {
                if !self.invalid.contains(&c) {
                    found.push(c);
                }
            });
        }
        found
    }

    /// [`query_range`](Self::query_range) resolved against the grid. Entries
    /// whose cell is empty or fails the filter are skipped.
    pub fn obstacles_in_range<'g>(&self, grid: &'g ObstacleGrid, rect: CellRect) -> Vec<(Coord, &'g Obstacle)> {
        let filter = self.config.filter;
        self.query_range(rect)
            .into_iter()
            .filter_map(|c| grid.get(c).map(|o| (c, o)))
            .filter(|(_, o)| o.flags.contains(filter))
            .collect()
    }

    /// [`query_k_nearest`](Self::query_k_nearest) resolved against the grid.
    pub fn nearest_obstacles<'g>(
        &mut self,
        grid: &'g ObstacleGrid,
        origin: Coord,
        k: usize,
        max_distance: u32,
    ) -> Vec<(Coord, &'g Obstacle)> {
        self.query_k_nearest(grid, origin, k, max_distance)
            .into_iter()
            .filter_map(|c| grid.get(c).map(|o| (c, o)))
            .collect()
    }
}
