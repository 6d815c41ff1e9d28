use bevy::log::debug;
use fixedbitset::FixedBitSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::nav::coord::{Coord, Metric};
use crate::nav::point_tree::PointTree;

mod cycle;
mod query;

pub use cycle::StepOutcome;
pub use query::AgentHit;

/// Source of truth for agent liveness and position.
///
/// `None` means the agent is dead or otherwise no longer tracked. The index
/// never owns agents; it asks the roster whenever it needs to know.
pub trait AgentRoster<H> {
    fn position(&self, handle: H) -> Option<Coord>;
}

impl<H, F> AgentRoster<H> for F
where
    F: Fn(H) -> Option<Coord>,
{
    fn position(&self, handle: H) -> Option<Coord> {
        self(handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentIndexConfig {
    pub metric: Metric,
    /// Stale entries a query may skip before returning what it has.
    pub invalid_skip_limit: usize,
    pub default_k: usize,
    pub default_max_distance: u32,
}

impl Default for AgentIndexConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            invalid_skip_limit: 32,
            default_k: 8,
            default_max_distance: 64,
        }
    }
}

/// Double-buffered k-nearest index over agents that move every tick.
///
/// Queries read the *active* tree while the *building* tree is filled one
/// agent per [`step`](AgentIndex::step). When the cursor has walked the whole
/// agent list the two trees swap roles, so a full rebuild costs one insert
/// per tick instead of an O(n log n) burst.
///
/// # Slot bookkeeping
///
/// Tree entries store a slot into `agents`. Dead or removed agents met by the
/// cursor are excluded and compacted out of `agents` at the swap; the slot
/// recorded for a live agent is `cursor - excluded_so_far`, which is exactly
/// its position in the compacted list the new active tree will be read against.
///
/// A removal is tracked in two stages. Until the cursor reaches the agent it
/// sits in `pending_removal`; once excluded it moves to `retired` until the
/// swap, because the active tree still holds its previous-cycle entry.
/// `listed` counts each handle's slots in `agents`, so removals of handles
/// that were never added (or are already gone) are dropped instead of
/// waiting forever.
///
/// # Example
///
/// ```rust
/// use lodestar::nav::agent_index::{AgentIndex, AgentIndexConfig};
/// use lodestar::nav::coord::Coord;
///
/// let positions = [Coord::new(0, 0), Coord::new(5, 5)];
/// let roster = |id: usize| positions.get(id).copied();
///
/// let mut index = AgentIndex::new(AgentIndexConfig::default());
/// index.add(0);
/// index.add(1);
/// while index.completed_cycles() == 0 {
///     index.step(&roster);
/// }
///
/// let hits = index.query_k_nearest(&roster, Coord::new(1, 1), 1, 100);
/// assert_eq!(hits[0].handle, 0);
/// ```
#[derive(Debug, Clone)]
pub struct AgentIndex<H> {
    active: PointTree<u32>,
    building: PointTree<u32>,
    agents: Vec<H>,
    cursor: usize,
    excluded: FixedBitSet,
    excluded_count: usize,
    pending_removal: FxHashSet<H>,
    retired: FxHashSet<H>,
    listed: FxHashMap<H, u32>,
    config: AgentIndexConfig,
    cycles: u64,
}

impl<H> AgentIndex<H>
where
    H: Copy + Eq + Hash,
{
    pub fn new(config: AgentIndexConfig) -> Self {
        Self {
            active: PointTree::new(),
            building: PointTree::new(),
            agents: Vec::new(),
            cursor: 0,
            excluded: FixedBitSet::new(),
            excluded_count: 0,
            pending_removal: FxHashSet::default(),
            retired: FxHashSet::default(),
            listed: FxHashMap::default(),
            config,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &AgentIndexConfig {
        &self.config
    }

    /// Appends an agent. It becomes queryable once a build cycle has reached
    /// it and then completed.
    pub fn add(&mut self, handle: H) {
        self.agents.push(handle);
        *self.listed.entry(handle).or_insert(0) += 1;
    }

    /// Schedules removal. Queries filter the agent out from now on. The build
    /// cursor excludes it when it next reaches the agent, and the slot is
    /// compacted away at the following swap.
    ///
    /// Handles not in the list are ignored.
    pub fn remove(&mut self, handle: H) {
        if !self.listed.contains_key(&handle) {
            debug!("[AGENT_INDEX] Removal of an agent that is not listed, ignored");
            return;
        }
        self.pending_removal.insert(handle);
    }

    /// Agents in the list, including ones awaiting exclusion.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Entries in the tree queries currently read from.
    pub fn indexed_len(&self) -> usize {
        self.active.len()
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_removal.len()
    }

    pub fn is_pending_removal(&self, handle: H) -> bool {
        self.pending_removal.contains(&handle)
    }

    /// Removed, either still queued or excluded from the cycle in progress.
    pub fn is_removed(&self, handle: H) -> bool {
        self.pending_removal.contains(&handle) || self.retired.contains(&handle)
    }

    pub fn completed_cycles(&self) -> u64 {
        self.cycles
    }

    /// Position of the build cursor within the current cycle.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
