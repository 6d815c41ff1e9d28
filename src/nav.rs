//! Spatial indexing and flow-field navigation.
//!
//! Data flows one way: [`grid::ObstacleGrid`] changes are drained by the
//! [`navigation::NavigationService`], which keeps its target index, bounds
//! and flow field current. Agents are indexed separately by the amortized
//! [`agent_index::AgentIndex`], one step per fixed tick.

pub mod agent_index;
pub mod collections;
pub mod config;
pub mod coord;
pub mod flow_field;
pub mod grid;
pub mod navigation;
pub mod obstacle_index;
pub mod point_tree;
pub mod profiling;

pub use config::NavConfig;
pub use coord::{CellRect, Coord, Metric};
pub use navigation::{NavSet, NavigationPlugin, NavigationService, Steering};
