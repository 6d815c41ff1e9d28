use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::service::Steering;
use crate::nav::agent_index::AgentIndex;
use crate::nav::coord::Coord;

/// Cell an entity currently occupies.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPosition(pub Coord);

/// Marks entities that belong in the [`TrackedAgents`] index.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TrackedAgent;

/// Entities that follow the flow field toward targets.
#[derive(Component, Debug, Clone, Copy, Default)]
#[require(NextStep)]
pub struct Seeker;

/// Steering decision for this tick, written by `plan_next_steps`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextStep(pub Option<Steering>);

/// Fixed-tick counter for navigation systems and periodic logging.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavTick(pub u64);

impl NavTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Amortized nearest-agent index over every [`TrackedAgent`].
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct TrackedAgents(pub AgentIndex<Entity>);
