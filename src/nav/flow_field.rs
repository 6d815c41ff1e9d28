use bevy::prelude::*;
use std::time::Instant;

use crate::nav::coord::{CellRect, Coord};
use crate::nav::grid::ObstacleGrid;
use crate::nav::obstacle_index::ObstacleIndex;

/// Integration value of a cell no target can reach.
const UNREACHABLE: u32 = u32::MAX;
/// Next-step value of a cell with nowhere to go.
const NO_STEP: u32 = u32::MAX;

/// 8-connected neighbourhood; the flag marks diagonals.
const NEIGHBORS: [(i32, i32, bool); 8] = [
    (-1, 0, false),
    (1, 0, false),
    (0, -1, false),
    (0, 1, false),
    (-1, -1, true),
    (-1, 1, true),
    (1, -1, true),
    (1, 1, true),
];

/// Sweep orders for the relaxation: (reverse x, reverse y).
const SWEEPS: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    /// Upper bound on relaxation passes; each pass is four directional sweeps.
    pub max_iterations: usize,
    pub orthogonal_cost: u32,
    pub diagonal_cost: u32,
    /// Extra cost per durability point of a target, approximating time to clear it.
    pub durability_cost: u32,
    /// Largest region, in cells, a build will allocate.
    pub max_cells: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            orthogonal_cost: 10,
            diagonal_cost: 14,
            durability_cost: 1,
            max_cells: 1 << 22,
        }
    }
}

impl FlowSettings {
    fn step_cost(&self, diagonal: bool) -> u32 {
        if diagonal {
            self.diagonal_cost
        } else {
            self.orthogonal_cost
        }
    }
}

/// Dense next-step field over a rectangular region.
///
/// Every indexed obstacle inside the region is a target, seeded with a cost
/// derived from its durability. A multi-source relaxation spreads cumulative
/// cost outward from all targets at once; each cell then points at the
/// neighbour that most reduces that cost. Querying a cell is one array read.
///
/// # Algorithm
///
/// 1. **Seeds:** targets get `durability * durability_cost`, all other cells
///    start unreachable.
/// 2. **Bake:** Gauss–Seidel relaxation over the 8-neighbourhood, sweeping in
///    all four diagonal directions per pass, until nothing changes or
///    `max_iterations` passes have run. Nothing inside the region blocks
///    movement, so optimal routes are monotone and one pass usually settles
///    the field; the second pass only confirms it.
/// 3. **Next step:** a target whose own seed is its best cost points at itself
///    (arrival). Any other cell points at the neighbour with the lowest
///    `integration + step cost` (ties broken toward the lower integration value),
///    restricted to neighbours strictly cheaper than the cell, so every chain
///    strictly descends and ends at a target.
///
/// The whole field is reallocated on every build; there is no incremental update.
#[derive(Debug, Clone, Default)]
pub struct FlowField {
    region: Option<CellRect>,
    integration: Vec<u32>,
    next: Vec<u32>,
}

impl FlowField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Region of the last successful build, if the field is valid.
    pub fn region(&self) -> Option<CellRect> {
        self.region
    }

    pub fn is_valid(&self) -> bool {
        self.region.is_some()
    }

    /// Drops the field; lookups report not-found until the next build.
    pub fn invalidate(&mut self) {
        self.region = None;
        self.integration = Vec::new();
        self.next = Vec::new();
    }

    /// Bakes a fresh field over `region`. Blocks until the bake finishes.
    ///
    /// Returns the number of relaxation passes used, or `None` when the region
    /// exceeds `max_cells`; the field is then left invalid.
    pub fn build(
        &mut self,
        region: CellRect,
        targets: &ObstacleIndex,
        grid: &ObstacleGrid,
        settings: &FlowSettings,
    ) -> Option<usize> {
        let started = Instant::now();
        let cells = region.area();
        // Next-step entries are u32 indices with u32::MAX reserved.
        let limit = settings.max_cells.min(NO_STEP as usize);
        if cells > limit {
            warn!(
                "[FLOW_FIELD] Region {:?}..{:?} has {} cells, over the {} cell limit; field dropped",
                region.min, region.max, cells, limit
            );
            self.invalidate();
            return None;
        }

        let mut seeds = vec![UNREACHABLE; cells];
        let mut target_count = 0usize;
        for (c, obstacle) in targets.obstacles_in_range(grid, region) {
            if let Some(idx) = region.index_of(c) {
                let cost = obstacle.durability.saturating_mul(settings.durability_cost);
                seeds[idx] = seeds[idx].min(cost);
                target_count += 1;
            }
        }

        let mut integration = seeds.clone();
        let passes = relax(&mut integration, region, settings);
        let next = descend(&integration, &seeds, region, settings);

        self.region = Some(region);
        self.integration = integration;
        self.next = next;

        debug!(
            "[FLOW_FIELD] Baked {}x{} region at {:?} ({} targets) in {} passes, {:?}",
            region.width(),
            region.height(),
            region.min,
            target_count,
            passes,
            started.elapsed()
        );
        Some(passes)
    }

    /// The cell to move to from `c`, or `None` when `c` lies outside the baked
    /// region or no target is reachable from it. Targets return themselves.
    pub fn next_cell(&self, c: Coord) -> Option<Coord> {
        let region = self.region?;
        let idx = region.index_of(c)?;
        match self.next[idx] {
            NO_STEP => None,
            next => Some(region.coord_of(next as usize)),
        }
    }

    /// Cumulative cost from `c` to its cheapest target.
    pub fn integration_cost(&self, c: Coord) -> Option<u32> {
        let region = self.region?;
        let idx = region.index_of(c)?;
        match self.integration[idx] {
            UNREACHABLE => None,
            cost => Some(cost),
        }
    }
}

fn neighbor_index(region: CellRect, x: usize, y: usize, dx: i32, dy: i32) -> Option<usize> {
    let nx = x as i64 + dx as i64;
    let ny = y as i64 + dy as i64;
    if nx < 0 || ny < 0 || nx >= region.width() as i64 || ny >= region.height() as i64 {
        return None;
    }
    Some(ny as usize * region.width() + nx as usize)
}

/// Relaxes `field` in place. Returns the number of passes run.
fn relax(field: &mut [u32], region: CellRect, settings: &FlowSettings) -> usize {
    let (width, height) = (region.width(), region.height());
    let max_passes = settings.max_iterations.max(1);

    for pass in 1..=max_passes {
        let mut changed = false;
        for (reverse_x, reverse_y) in SWEEPS {
            for row in 0..height {
                let y = if reverse_y { height - 1 - row } else { row };
                for col in 0..width {
                    let x = if reverse_x { width - 1 - col } else { col };
                    let idx = y * width + x;
                    let mut best = field[idx];
                    for (dx, dy, diagonal) in NEIGHBORS {
                        let Some(n) = neighbor_index(region, x, y, dx, dy) else { continue };
                        if field[n] == UNREACHABLE {
                            continue;
                        }
                        best = best.min(field[n].saturating_add(settings.step_cost(diagonal)));
                    }
                    if best < field[idx] {
                        field[idx] = best;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            return pass;
        }
    }
    warn!(
        "[FLOW_FIELD] Relaxation hit the {} pass limit before settling",
        max_passes
    );
    max_passes
}

fn descend(integration: &[u32], seeds: &[u32], region: CellRect, settings: &FlowSettings) -> Vec<u32> {
    let (width, height) = (region.width(), region.height());
    let mut next = vec![NO_STEP; integration.len()];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let own = integration[idx];
            if own == UNREACHABLE {
                continue;
            }
            if seeds[idx] != UNREACHABLE && seeds[idx] <= own {
                next[idx] = idx as u32;
                continue;
            }

            // Ties on total cost go to the neighbour closer to a target.
            let mut best: Option<(u32, u32, usize)> = None;
            for (dx, dy, diagonal) in NEIGHBORS {
                let Some(n) = neighbor_index(region, x, y, dx, dy) else { continue };
                if integration[n] >= own {
                    continue;
                }
                let via = integration[n].saturating_add(settings.step_cost(diagonal));
                if best.map_or(true, |(cost, remaining, _)| (via, integration[n]) < (cost, remaining)) {
                    best = Some((via, integration[n], n));
                }
            }
            if let Some((_, _, n)) = best {
                next[idx] = n as u32;
            }
        }
    }
    next
}
