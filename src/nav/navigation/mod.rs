/// Navigation layer: the flow-field service and its ECS wiring.
///
/// This module is organized into:
/// - **service**: `NavigationService`, which keeps the flow field in step with the obstacle grid
/// - **components**: positions, agent/seeker markers, tick counter, agent index resource
/// - **events**: messages announcing field rebuilds
/// - **systems**: fixed-tick systems for sync, agent indexing and steering

use bevy::prelude::*;

use crate::nav::agent_index::AgentIndex;
use crate::nav::config::{NavConfig, DEFAULT_CONFIG_PATH};
use crate::nav::grid::{Layer, ObstacleGrid};

pub mod components;
pub mod events;
pub mod service;
pub mod systems;

#[cfg(test)]
mod tests;

pub use components::*;
pub use events::*;
pub use service::{NavigationService, Steering, SyncOutcome};

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum NavSet {
    Sync,     // Grid changes into the target index, bounds and field
    Index,    // Agent index membership and one build step
    Steering, // Next steps for seekers
}

/// Installs the grid, the navigation service and the agent index.
///
/// An [`ObstacleGrid`] inserted before the plugin is kept and its contents
/// seed the first flow field.
pub struct NavigationPlugin {
    pub config: NavConfig,
}

impl Default for NavigationPlugin {
    fn default() -> Self {
        Self {
            config: NavConfig::load(DEFAULT_CONFIG_PATH),
        }
    }
}

impl NavigationPlugin {
    pub fn with_config(config: NavConfig) -> Self {
        Self { config }
    }
}

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone();

        app.insert_resource(Time::<Fixed>::from_hz(config.tick_rate));

        let mut grid = app
            .world_mut()
            .remove_resource::<ObstacleGrid>()
            .unwrap_or_else(|| ObstacleGrid::new(Layer::STRUCTURES));
        let service = NavigationService::new(&mut grid, &config);
        app.insert_resource(grid);
        app.insert_resource(service);
        app.insert_resource(TrackedAgents(AgentIndex::new(config.agent_index())));
        app.init_resource::<NavTick>();
        app.insert_resource(config);

        app.add_message::<FlowFieldRebuilt>();

        app.configure_sets(FixedUpdate, (
            NavSet::Sync,
            NavSet::Index,
            NavSet::Steering,
        ).chain());

        app.add_systems(FixedUpdate, (
            systems::advance_tick.before(NavSet::Sync),
            systems::sync_obstacles.in_set(NavSet::Sync),
            (
                systems::track_spawned_agents,
                systems::untrack_removed_agents,
                systems::step_agent_index,
            ).chain().in_set(NavSet::Index),
            systems::plan_next_steps.in_set(NavSet::Steering),
        ));
    }
}
