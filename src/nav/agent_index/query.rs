use bevy::prelude::*;
use std::hash::Hash;

use super::{AgentIndex, AgentRoster};
use crate::nav::coord::Coord;

/// One k-nearest result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentHit<H> {
    pub handle: H,
    /// Position sampled when the agent was indexed.
    pub coord: Coord,
    /// Distance from the query origin in the index metric's units.
    pub distance: u64,
}

impl<H> AgentIndex<H>
where
    H: Copy + Eq + Hash,
{
    /// Up to `k` live agents within `max_distance` cells of `origin`, nearest
    /// first.
    ///
    /// Stale entries (dead or removed) are skipped without using up a
    /// result. Once more than `invalid_skip_limit` of them have been skipped
    /// the query returns whatever it has, so a badly degraded generation
    /// cannot turn one query into a scan of the whole tree.
    pub fn query_k_nearest(
        &self,
        roster: &impl AgentRoster<H>,
        origin: Coord,
        k: usize,
        max_distance: u32,
    ) -> Vec<AgentHit<H>> {
        let mut hits = Vec::new();
        if k == 0 {
            return hits;
        }

        let metric = self.config.metric;
        let mut skipped = 0usize;
        for neighbor in self.active.nearest(origin, metric, metric.limit(max_distance)) {
            let Some(&handle) = self.agents.get(neighbor.item as usize) else {
                debug_assert!(false, "agent slot {} past list end {}", neighbor.item, self.agents.len());
                warn!("[AGENT_INDEX] Slot {} out of range, skipping", neighbor.item);
                skipped += 1;
                continue;
            };

            let live = !self.is_removed(handle) && roster.position(handle).is_some();
            if !live {
                skipped += 1;
                if skipped > self.config.invalid_skip_limit {
                    break;
                }
                continue;
            }

            hits.push(AgentHit {
                handle,
                coord: neighbor.coord,
                distance: neighbor.distance,
            });
            if hits.len() == k {
                break;
            }
        }
        hits
    }

    /// [`query_k_nearest`](Self::query_k_nearest) with the configured default
    /// k and radius.
    pub fn query_nearby(&self, roster: &impl AgentRoster<H>, origin: Coord) -> Vec<AgentHit<H>> {
        self.query_k_nearest(
            roster,
            origin,
            self.config.default_k,
            self.config.default_max_distance,
        )
    }
}
