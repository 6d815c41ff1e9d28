//! Fixed-tick systems driving the indices and the navigator.

use bevy::prelude::*;

use super::components::*;
use super::events::FlowFieldRebuilt;
use super::service::{NavigationService, SyncOutcome};
use crate::nav::agent_index::StepOutcome;
use crate::nav::grid::ObstacleGrid;
use crate::nav::profiling::profile;
use crate::profile_log;

// ============================================================================
// Tick Management
// ============================================================================

/// Runs first in `FixedUpdate` so every navigation system sees the same tick.
pub fn advance_tick(mut tick: ResMut<NavTick>) {
    tick.increment();
}

// ============================================================================
// Obstacles and Flow Field
// ============================================================================

/// Drains grid changes into the service and announces field rebuilds.
#[profile(2)]
pub fn sync_obstacles(
    tick: Res<NavTick>,
    mut grid: ResMut<ObstacleGrid>,
    mut service: ResMut<NavigationService>,
    mut rebuilt: MessageWriter<FlowFieldRebuilt>,
) {
    match service.sync(&mut grid) {
        SyncOutcome::FieldRebuilt(region) => {
            rebuilt.write(FlowFieldRebuilt { region: Some(region) });
        }
        SyncOutcome::FieldInvalidated => {
            rebuilt.write(FlowFieldRebuilt { region: None });
        }
        SyncOutcome::Unchanged => {}
    }

    profile_log!(
        tick,
        "[NAVIGATION] tick {}: {} targets, {} tombstones, {} field rebuilds",
        tick.0,
        service.bounds().len(),
        service.targets().invalid_count(),
        service.rebuild_count()
    );
}

// ============================================================================
// Agent Index
// ============================================================================

pub fn track_spawned_agents(
    mut agents: ResMut<TrackedAgents>,
    spawned: Query<Entity, Added<TrackedAgent>>,
) {
    for entity in &spawned {
        agents.add(entity);
    }
}

/// Also fires for despawned entities.
pub fn untrack_removed_agents(
    mut agents: ResMut<TrackedAgents>,
    mut removed: RemovedComponents<TrackedAgent>,
) {
    for entity in removed.read() {
        agents.remove(entity);
    }
}

/// One amortized build step per tick.
#[profile(1)]
pub fn step_agent_index(
    tick: Res<NavTick>,
    mut agents: ResMut<TrackedAgents>,
    positions: Query<&GridPosition, With<TrackedAgent>>,
) {
    let roster = |entity: Entity| positions.get(entity).ok().map(|p| p.0);
    if agents.step(&roster) == StepOutcome::Swapped {
        debug!(
            "[AGENT_INDEX] tick {}: cycle {} complete, {} agents indexed",
            tick.0,
            agents.completed_cycles(),
            agents.indexed_len()
        );
    }
}

// ============================================================================
// Steering
// ============================================================================

#[profile(2)]
pub fn plan_next_steps(
    tick: Res<NavTick>,
    grid: Res<ObstacleGrid>,
    mut service: ResMut<NavigationService>,
    mut seekers: Query<(&GridPosition, &mut NextStep), With<Seeker>>,
) {
    for (position, mut next) in &mut seekers {
        next.0 = service.steer(&grid, position.0);
    }

    profile_log!(
        tick,
        "[NAVIGATION] tick {}: {} seekers without a target",
        tick.0,
        seekers.iter().filter(|(_, next)| next.0.is_none()).count()
    );
}
