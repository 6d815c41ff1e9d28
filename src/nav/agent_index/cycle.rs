use bevy::prelude::*;
use std::hash::Hash;

use super::{AgentIndex, AgentRoster};
use crate::nav::point_tree::PointTree;

/// What a single [`AgentIndex::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No agents to index.
    Idle,
    /// The agent under the cursor was inserted into the building tree.
    Indexed,
    /// The agent under the cursor was dead or pending removal.
    Excluded,
    /// The cursor had consumed the list; trees swapped and the list compacted.
    Swapped,
}

impl<H> AgentIndex<H>
where
    H: Copy + Eq + Hash,
{
    /// Advances the build cycle by exactly one agent. Call once per tick.
    pub fn step(&mut self, roster: &impl AgentRoster<H>) -> StepOutcome {
        if self.agents.is_empty() {
            return StepOutcome::Idle;
        }

        if self.cursor >= self.agents.len() {
            self.swap_generations();
            return StepOutcome::Swapped;
        }

        let handle = self.agents[self.cursor];
        let position = if self.pending_removal.remove(&handle) {
            self.retired.insert(handle);
            None
        } else {
            roster.position(handle)
        };

        let outcome = match position {
            Some(coord) => {
                let slot = (self.cursor - self.excluded_count) as u32;
                // The building tree is unbounded, insert cannot fail.
                let _ = self.building.insert(coord, slot);
                StepOutcome::Indexed
            }
            None => {
                self.excluded.grow(self.cursor + 1);
                self.excluded.insert(self.cursor);
                self.excluded_count += 1;
                StepOutcome::Excluded
            }
        };
        self.cursor += 1;
        outcome
    }

    /// Runs `step` until the current cycle swaps. Mostly useful for tests and
    /// for warm-starting an index after a bulk spawn.
    pub fn finish_cycle(&mut self, roster: &impl AgentRoster<H>) {
        while !matches!(self.step(roster), StepOutcome::Swapped | StepOutcome::Idle) {}
    }

    fn swap_generations(&mut self) {
        std::mem::swap(&mut self.active, &mut self.building);
        self.building = PointTree::new();

        // Order-preserving compaction: survivors shift down by the number of
        // excluded slots before them, matching the slots recorded this cycle.
        let before = self.agents.len();
        let excluded = &self.excluded;
        let listed = &mut self.listed;
        let mut slot = 0usize;
        self.agents.retain(|handle| {
            let keep = !excluded.contains(slot);
            slot += 1;
            if !keep {
                if let Some(count) = listed.get_mut(handle) {
                    *count -= 1;
                    if *count == 0 {
                        listed.remove(handle);
                    }
                }
            }
            keep
        });
        debug_assert_eq!(before - self.agents.len(), self.excluded_count);

        self.excluded.clear();
        self.excluded_count = 0;
        self.retired.clear();
        self.cursor = 0;
        self.cycles += 1;

        debug!(
            "[AGENT_INDEX] Cycle {} complete: {} indexed, {} compacted out",
            self.cycles,
            self.active.len(),
            before - self.agents.len()
        );
    }
}
