use bevy::prelude::*;
use rustc_hash::FxHashSet;

use crate::nav::coord::{CellRect, Coord, Metric};
use crate::nav::grid::{FilterTransition, ObstacleChange, ObstacleFlags, ObstacleGrid};
use crate::nav::point_tree::PointTree;

mod query;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleIndexConfig {
    /// Only cells whose flags contain all of these bits are indexed.
    pub filter: ObstacleFlags,
    pub metric: Metric,
    /// Tombstoned fraction of visited candidates that triggers a rebuild.
    pub invalid_ratio: f32,
    /// Limits are the occupied extent grown by this fraction per side.
    pub rebuild_padding: f32,
}

impl Default for ObstacleIndexConfig {
    fn default() -> Self {
        Self {
            filter: ObstacleFlags::NONE,
            metric: Metric::Manhattan,
            invalid_ratio: 0.25,
            rebuild_padding: 0.25,
        }
    }
}

/// Lazily rebuilt point index over obstacle cells.
///
/// Obstacles change rarely compared to agents, so the index never deletes
/// physically. [`remove`](ObstacleIndex::remove) tombstones a coordinate;
/// queries skip tombstones and, when too many of their candidates turn out to
/// be stale, rebuild once from the grid and retry. [`rebuild`](ObstacleIndex::rebuild)
/// is the only place entries are dropped.
///
/// The grid is the source of truth and is passed into each call rather than
/// held, so the index stores coordinates only.
///
/// # Invariant
///
/// Every tree entry not in `invalid` should be an occupied grid cell matching
/// the filter. The grid can change without the index being told, so queries
/// treat an entry that fails this check like a tombstone.
#[derive(Debug, Clone)]
pub struct ObstacleIndex {
    tree: Option<PointTree<()>>,
    invalid: FxHashSet<Coord>,
    config: ObstacleIndexConfig,
    rebuilds: u64,
}

impl ObstacleIndex {
    pub fn new(config: ObstacleIndexConfig) -> Self {
        Self {
            tree: None,
            invalid: FxHashSet::default(),
            config,
            rebuilds: 0,
        }
    }

    pub fn config(&self) -> &ObstacleIndexConfig {
        &self.config
    }

    pub fn filter(&self) -> ObstacleFlags {
        self.config.filter
    }

    pub fn is_initialized(&self) -> bool {
        self.tree.is_some()
    }

    /// Tombstoned coordinates awaiting the next rebuild.
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    /// Physical entries, tombstones included.
    pub fn physical_len(&self) -> usize {
        self.tree.as_ref().map_or(0, PointTree::len)
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Current hard limits of the tree.
    pub fn limits(&self) -> Option<CellRect> {
        self.tree.as_ref().and_then(PointTree::limits)
    }

    fn matches(&self, grid: &ObstacleGrid, c: Coord) -> bool {
        grid.get(c)
            .is_some_and(|o| o.flags.contains(self.config.filter))
    }

    /// Indexes `c`. Rebuilds first when the tree does not exist yet or `c` is
    /// outside its limits; a tombstoned `c` is simply revived.
    ///
    /// Cells that are empty in the grid or fail the filter are ignored.
    pub fn add(&mut self, grid: &ObstacleGrid, c: Coord) {
        if !self.matches(grid, c) {
            debug!("[OBSTACLE_INDEX] {:?} is not an indexed obstacle, ignored", c);
            return;
        }

        let Some(tree) = self.tree.as_mut().filter(|t| t.accepts(c)) else {
            // The rebuild scans the grid, which already holds `c`.
            self.rebuild(grid);
            return;
        };

        if self.invalid.remove(&c) || tree.contains(c) {
            return;
        }
        // Limits were checked above.
        let _ = tree.insert(c, ());
    }

    /// Tombstones `c`. The entry stays in the tree until the next rebuild.
    /// Coordinates the tree never held are ignored.
    pub fn remove(&mut self, c: Coord) {
        if self.tree.as_ref().is_some_and(|t| t.contains(c)) {
            self.invalid.insert(c);
        }
    }

    /// Applies a grid notification through the flag filter.
    pub fn apply_change(&mut self, grid: &ObstacleGrid, change: &ObstacleChange) -> FilterTransition {
        let transition = change.transition(self.config.filter);
        match transition {
            FilterTransition::Entered => self.add(grid, change.coord),
            FilterTransition::Left => self.remove(change.coord),
            FilterTransition::Unchanged => {}
        }
        transition
    }

    /// Rebuilds the tree from the grid in one O(n) pass.
    ///
    /// Limits come from the extent of *all* occupied cells, padded by
    /// `rebuild_padding`, so later additions near existing ones do not force
    /// another rebuild.
    pub fn rebuild(&mut self, grid: &ObstacleGrid) {
        self.invalid.clear();
        self.rebuilds += 1;

        let mut extent: Option<CellRect> = None;
        let mut entries = Vec::with_capacity(grid.len());
        for (c, obstacle) in grid.iter() {
            match &mut extent {
                Some(rect) => rect.include(c),
                None => extent = Some(CellRect::point(c)),
            }
            if obstacle.flags.contains(self.config.filter) {
                entries.push((c, ()));
            }
        }

        let Some(extent) = extent else {
            self.tree = None;
            debug!("[OBSTACLE_INDEX] Grid empty, index left uninitialized");
            return;
        };

        let span = extent.width().max(extent.height()) as f32;
        let padding = ((span * self.config.rebuild_padding).ceil() as i32).max(1);
        let limits = extent.padded(padding);
        let indexed = entries.len();
        self.tree = Some(PointTree::build(Some(limits), entries));

        debug!(
            "[OBSTACLE_INDEX] Rebuilt: {} of {} cells indexed, limits {:?}",
            indexed,
            grid.len(),
            limits
        );
    }
}
