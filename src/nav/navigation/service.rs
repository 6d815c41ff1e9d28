use bevy::prelude::*;

use crate::nav::collections::{BoundsRemoval, BoundsTracker};
use crate::nav::config::NavConfig;
use crate::nav::coord::{CellRect, Coord};
use crate::nav::flow_field::{FlowField, FlowSettings};
use crate::nav::grid::{FilterTransition, Obstacle, ObserverId, ObstacleGrid};
use crate::nav::obstacle_index::ObstacleIndex;

/// Where a seeker should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steering {
    /// The baked field covers the seeker.
    Field { next: Coord },
    /// Outside the field: head straight for the nearest known target.
    Direct { target: Coord, next: Coord },
}

impl Steering {
    pub fn next(&self) -> Coord {
        match *self {
            Steering::Field { next } | Steering::Direct { next, .. } => next,
        }
    }
}

/// What a [`NavigationService::sync`] call did to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No queued change touched the target set.
    Unchanged,
    FieldRebuilt(CellRect),
    /// No field covers the targets, either because none are left or because
    /// their region is too large to bake. Lookups fall back to direct movement.
    FieldInvalidated,
}

/// Keeps a flow field pointing at the current target set.
///
/// The service observes the obstacle grid. Each [`sync`](Self::sync) drains
/// the queued changes, routes them through the target index's flag filter,
/// and mirrors every target entering or leaving the filter into a
/// [`BoundsTracker`]. If anything relevant changed, the field is rebuilt once
/// over the tracked bounds grown by `bounds_padding` on every side.
#[derive(Resource, Debug)]
pub struct NavigationService {
    observer: ObserverId,
    targets: ObstacleIndex,
    bounds: BoundsTracker,
    field: FlowField,
    flow: FlowSettings,
    padding: i32,
    default_k: usize,
    max_distance: u32,
    rebuilds: u64,
}

impl NavigationService {
    /// Registers with `grid` and bakes an initial field from whatever targets
    /// it already holds.
    pub fn new(grid: &mut ObstacleGrid, config: &NavConfig) -> Self {
        let observer = grid.observe();
        let mut service = Self {
            observer,
            targets: ObstacleIndex::new(config.obstacle_index()),
            bounds: BoundsTracker::new(),
            field: FlowField::new(),
            flow: config.flow(),
            padding: config.bounds_padding.max(0),
            default_k: config.k_nearest_default,
            max_distance: config.max_query_distance,
            rebuilds: 0,
        };

        let filter = service.targets.filter();
        for (c, obstacle) in grid.iter() {
            if obstacle.flags.contains(filter) {
                service.bounds.add(c);
            }
        }
        if !grid.is_empty() {
            service.targets.rebuild(grid);
        }
        service.rebuild_field(grid);
        service
    }

    /// Stops observing `grid`. The service keeps answering from its last state.
    pub fn detach(&self, grid: &mut ObstacleGrid) {
        grid.unobserve(self.observer);
    }

    /// Applies every grid change queued since the last call.
    pub fn sync(&mut self, grid: &mut ObstacleGrid) -> SyncOutcome {
        let changes = grid.take_changes(self.observer);
        if changes.is_empty() {
            return SyncOutcome::Unchanged;
        }

        let mut relevant = false;
        for change in &changes {
            match self.targets.apply_change(grid, change) {
                FilterTransition::Entered => {
                    self.bounds.add(change.coord);
                    relevant = true;
                }
                FilterTransition::Left => match self.bounds.remove(change.coord) {
                    BoundsRemoval::Removed => relevant = true,
                    BoundsRemoval::NotTracked => {
                        warn!("[NAVIGATION] {:?} left the target set but was never tracked", change.coord);
                    }
                },
                FilterTransition::Unchanged => {}
            }
        }

        if !relevant {
            return SyncOutcome::Unchanged;
        }
        self.rebuild_field(grid)
    }

    fn rebuild_field(&mut self, grid: &ObstacleGrid) -> SyncOutcome {
        let Some(bounds) = self.bounds.bounds() else {
            if self.field.is_valid() {
                info!("[NAVIGATION] No targets left, flow field invalidated");
            }
            self.field.invalidate();
            return SyncOutcome::FieldInvalidated;
        };

        let region = bounds.padded(self.padding);
        if self.field.build(region, &self.targets, grid, &self.flow).is_none() {
            return SyncOutcome::FieldInvalidated;
        }
        self.rebuilds += 1;
        info!(
            "[NAVIGATION] Flow field #{} rebuilt over {:?}..{:?} ({} targets)",
            self.rebuilds,
            region.min,
            region.max,
            self.bounds.len()
        );
        SyncOutcome::FieldRebuilt(region)
    }

    /// Next cell toward the nearest target, if the field covers `c`.
    pub fn next_step(&self, c: Coord) -> Option<Coord> {
        self.field.next_cell(c)
    }

    /// Field lookup with the direct-line fallback.
    ///
    /// `None` only when there is no target anywhere.
    pub fn steer(&mut self, grid: &ObstacleGrid, c: Coord) -> Option<Steering> {
        if let Some(next) = self.field.next_cell(c) {
            return Some(Steering::Field { next });
        }
        let target = *self.targets.query_k_nearest(grid, c, 1, u32::MAX).first()?;
        Some(Steering::Direct {
            target,
            next: c.step_toward(target),
        })
    }

    /// Up to `k` targets nearest to `origin` within `max_distance`.
    pub fn nearest_targets(&mut self, grid: &ObstacleGrid, origin: Coord, k: usize, max_distance: u32) -> Vec<Coord> {
        self.targets.query_k_nearest(grid, origin, k, max_distance)
    }

    /// [`nearest_targets`](Self::nearest_targets) with the configured defaults.
    pub fn nearby_targets(&mut self, grid: &ObstacleGrid, origin: Coord) -> Vec<Coord> {
        self.targets.query_k_nearest(grid, origin, self.default_k, self.max_distance)
    }

    pub fn targets_in_range<'g>(&self, grid: &'g ObstacleGrid, rect: CellRect) -> Vec<(Coord, &'g Obstacle)> {
        self.targets.obstacles_in_range(grid, rect)
    }

    pub fn targets(&self) -> &ObstacleIndex {
        &self.targets
    }

    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    pub fn field(&self) -> &FlowField {
        &self.field
    }

    pub fn region(&self) -> Option<CellRect> {
        self.field.region()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
