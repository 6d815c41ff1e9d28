use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::nav::agent_index::AgentIndexConfig;
use crate::nav::coord::Metric;
use crate::nav::flow_field::FlowSettings;
use crate::nav::grid::ObstacleFlags;
use crate::nav::obstacle_index::ObstacleIndexConfig;

pub const DEFAULT_CONFIG_PATH: &str = "assets/nav_config.ron";

/// Tunables for the spatial indices and the navigator, loaded once at startup.
///
/// None of these are contracts; the defaults are what the demo ships with.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    // Simulation
    pub tick_rate: f64,

    // Queries
    pub k_nearest_default: usize,
    pub max_query_distance: u32,

    // Dynamic agent index
    pub agent_metric: Metric,
    /// Stale entries a single k-nearest query may skip before giving up.
    pub agent_invalid_skip_limit: usize,

    // Static obstacle index
    pub obstacle_metric: Metric,
    /// Fraction of tombstoned candidates that triggers a rebuild-and-retry.
    pub obstacle_invalid_ratio: f32,
    /// Rebuild limits grow by this fraction of the occupied extent per side.
    pub obstacle_rebuild_padding: f32,
    /// Cells must carry every one of these flags to count as targets.
    pub target_filter: ObstacleFlags,

    // Flow field
    pub bounds_padding: i32,
    pub bake_iterations: usize,
    pub orthogonal_step_cost: u32,
    pub diagonal_step_cost: u32,
    /// Extra integration cost per remaining durability point of a target.
    pub durability_cost: u32,
    /// Regions above this many cells are not baked; seekers steer directly.
    pub max_field_cells: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20.0,
            k_nearest_default: 8,
            max_query_distance: 64,
            agent_metric: Metric::Euclidean,
            agent_invalid_skip_limit: 32,
            obstacle_metric: Metric::Manhattan,
            obstacle_invalid_ratio: 0.25,
            obstacle_rebuild_padding: 0.25,
            target_filter: ObstacleFlags::PLAYER_BUILT,
            bounds_padding: 24,
            bake_iterations: 64,
            orthogonal_step_cost: 10,
            diagonal_step_cost: 14,
            durability_cost: 1,
            max_field_cells: 1 << 22,
        }
    }
}

impl NavConfig {
    /// Reads a RON config from `path`. Missing or malformed files fall back to
    /// the defaults with an error in the log; startup never fails on config.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str::<NavConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded navigation config from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("Failed to parse navigation config: {}", e);
                    error!("Using default NavConfig");
                    NavConfig::default()
                }
            },
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                error!("Using default NavConfig");
                NavConfig::default()
            }
        }
    }

    pub fn agent_index(&self) -> AgentIndexConfig {
        AgentIndexConfig {
            metric: self.agent_metric,
            invalid_skip_limit: self.agent_invalid_skip_limit,
            default_k: self.k_nearest_default,
            default_max_distance: self.max_query_distance,
        }
    }

    pub fn obstacle_index(&self) -> ObstacleIndexConfig {
        ObstacleIndexConfig {
            filter: self.target_filter,
            metric: self.obstacle_metric,
            invalid_ratio: self.obstacle_invalid_ratio,
            rebuild_padding: self.obstacle_rebuild_padding,
        }
    }

    pub fn flow(&self) -> FlowSettings {
        FlowSettings {
            max_iterations: self.bake_iterations,
            orthogonal_cost: self.orthogonal_step_cost,
            diagonal_cost: self.diagonal_step_cost,
            durability_cost: self.durability_cost,
            max_cells: self.max_field_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults_for_missing_fields() {
        let config: NavConfig = ron::from_str("(bounds_padding: 8, obstacle_metric: Euclidean)").unwrap();
        assert_eq!(config.bounds_padding, 8);
        assert_eq!(config.obstacle_metric, Metric::Euclidean);
        assert_eq!(config.k_nearest_default, NavConfig::default().k_nearest_default);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = NavConfig::load("does/not/exist.ron");
        assert_eq!(config, NavConfig::default());
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/nav_config.ron");
        let contents = std::fs::read_to_string(path).unwrap();
        let config: NavConfig = ron::from_str(&contents).unwrap();
        assert_eq!(config.target_filter, ObstacleFlags::PLAYER_BUILT);
    }
}
