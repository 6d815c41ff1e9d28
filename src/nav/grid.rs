//! Backing sparse grid: the single owner of obstacle data.
//!
//! Indices never hold obstacles, only coordinates; they resolve them here.
//! Mutations are broadcast to every registered observer as an
//! [`ObstacleChange`] queued under its [`ObserverId`], and each observer drains
//! its own queue when it is ready. Data only flows grid → indices → navigator.

use bevy::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::nav::coord::Coord;

/// Bitmask classifying an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleFlags(pub u32);

impl ObstacleFlags {
    pub const NONE: ObstacleFlags = ObstacleFlags(0);
    /// Blocks line of sight and movement for creatures.
    pub const SOLID: ObstacleFlags = ObstacleFlags(1 << 0);
    /// Built by a player; hostile agents seek these out.
    pub const PLAYER_BUILT: ObstacleFlags = ObstacleFlags(1 << 1);
    /// Can be worn down by damage.
    pub const DESTRUCTIBLE: ObstacleFlags = ObstacleFlags(1 << 2);
    /// Emits light; used by agents that avoid or seek light.
    pub const LIGHT_SOURCE: ObstacleFlags = ObstacleFlags(1 << 3);
    pub const NATURAL: ObstacleFlags = ObstacleFlags(1 << 4);

    /// True when every bit of `filter` is set in `self`. An empty filter
    /// matches everything.
    pub fn contains(self, filter: ObstacleFlags) -> bool {
        self.0 & filter.0 == filter.0
    }

    pub fn union(self, other: ObstacleFlags) -> ObstacleFlags {
        ObstacleFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for ObstacleFlags {
    type Output = ObstacleFlags;

    fn bitor(self, rhs: ObstacleFlags) -> ObstacleFlags {
        self.union(rhs)
    }
}

/// Identifies which world layer a grid represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    pub const GROUND: Layer = Layer(0);
    pub const STRUCTURES: Layer = Layer(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub flags: ObstacleFlags,
    /// Remaining hit points; feeds the flow field's time-to-clear cost.
    pub durability: u32,
}

impl Obstacle {
    pub fn new(flags: ObstacleFlags, durability: u32) -> Self {
        Self { flags, durability }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleChangeKind {
    Placed { flags: ObstacleFlags },
    Removed { flags: ObstacleFlags },
    FlagsChanged { previous: ObstacleFlags, current: ObstacleFlags },
}

/// Notification queued for observers on every structural or flag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleChange {
    pub coord: Coord,
    pub layer: Layer,
    pub kind: ObstacleChangeKind,
}

/// How a change moves a cell relative to a flag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTransition {
    Entered,
    Left,
    Unchanged,
}

impl ObstacleChange {
    /// Current flags after the change (`NONE` when the cell was cleared).
    pub fn flags(&self) -> ObstacleFlags {
        match self.kind {
            ObstacleChangeKind::Placed { flags } => flags,
            ObstacleChangeKind::Removed { .. } => ObstacleFlags::NONE,
            ObstacleChangeKind::FlagsChanged { current, .. } => current,
        }
    }

    pub fn transition(&self, filter: ObstacleFlags) -> FilterTransition {
        let (before, after) = match self.kind {
            ObstacleChangeKind::Placed { flags } => (false, flags.contains(filter)),
            ObstacleChangeKind::Removed { flags } => (flags.contains(filter), false),
            ObstacleChangeKind::FlagsChanged { previous, current } => {
                (previous.contains(filter), current.contains(filter))
            }
        };
        match (before, after) {
            (false, true) => FilterTransition::Entered,
            (true, false) => FilterTransition::Left,
            _ => FilterTransition::Unchanged,
        }
    }
}

/// Handle returned by [`ObstacleGrid::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

#[derive(Resource, Debug, Default)]
pub struct ObstacleGrid {
    layer: Layer,
    cells: FxHashMap<Coord, Obstacle>,
    observers: Vec<Option<Vec<ObstacleChange>>>,
}

impl ObstacleGrid {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            ..Default::default()
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, c: Coord) -> Option<&Obstacle> {
        self.cells.get(&c)
    }

    pub fn contains(&self, c: Coord) -> bool {
        self.cells.contains_key(&c)
    }

    /// All occupied cells, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Obstacle)> {
        self.cells.iter().map(|(c, o)| (*c, o))
    }

    /// Registers an observer. Only changes made after this call are queued.
    pub fn observe(&mut self) -> ObserverId {
        if let Some(free) = self.observers.iter().position(Option::is_none) {
            self.observers[free] = Some(Vec::new());
            return ObserverId(free);
        }
        self.observers.push(Some(Vec::new()));
        ObserverId(self.observers.len() - 1)
    }

    pub fn unobserve(&mut self, id: ObserverId) {
        if let Some(slot) = self.observers.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Drains the changes queued for `id` since its last call.
    pub fn take_changes(&mut self, id: ObserverId) -> Vec<ObstacleChange> {
        match self.observers.get_mut(id.0) {
            Some(Some(queue)) => std::mem::take(queue),
            _ => {
                warn!("[GRID] take_changes for unknown observer {:?}", id);
                Vec::new()
            }
        }
    }

    fn notify(&mut self, coord: Coord, kind: ObstacleChangeKind) {
        let change = ObstacleChange {
            coord,
            layer: self.layer,
            kind,
        };
        for queue in self.observers.iter_mut().flatten() {
            queue.push(change);
        }
    }

    /// Occupies `c`, replacing any previous occupant. Returns the previous one.
    pub fn place(&mut self, c: Coord, obstacle: Obstacle) -> Option<Obstacle> {
        let previous = self.cells.insert(c, obstacle);
        let kind = match previous {
            None => ObstacleChangeKind::Placed {
                flags: obstacle.flags,
            },
            Some(old) if old.flags != obstacle.flags => ObstacleChangeKind::FlagsChanged {
                previous: old.flags,
                current: obstacle.flags,
            },
            Some(_) => return previous,
        };
        self.notify(c, kind);
        previous
    }

    pub fn remove(&mut self, c: Coord) -> Option<Obstacle> {
        let removed = self.cells.remove(&c)?;
        self.notify(
            c,
            ObstacleChangeKind::Removed {
                flags: removed.flags,
            },
        );
        Some(removed)
    }

    /// Returns false when `c` is empty.
    pub fn set_flags(&mut self, c: Coord, flags: ObstacleFlags) -> bool {
        let Some(obstacle) = self.cells.get_mut(&c) else {
            return false;
        };
        let previous = obstacle.flags;
        if previous == flags {
            return true;
        }
        obstacle.flags = flags;
        self.notify(
            c,
            ObstacleChangeKind::FlagsChanged {
                previous,
                current: flags,
            },
        );
        true
    }

    /// Durability edits do not notify observers.
    pub fn set_durability(&mut self, c: Coord, durability: u32) -> bool {
        match self.cells.get_mut(&c) {
            Some(obstacle) => {
                obstacle.durability = durability;
                true
            }
            None => false,
        }
    }

    /// Wears the obstacle at `c` down by `amount`, removing it at zero.
    /// Returns the remaining durability, or `None` if nothing was there.
    pub fn damage(&mut self, c: Coord, amount: u32) -> Option<u32> {
        let obstacle = self.cells.get_mut(&c)?;
        obstacle.durability = obstacle.durability.saturating_sub(amount);
        let remaining = obstacle.durability;
        if remaining == 0 {
            self.remove(c);
        }
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Obstacle {
        Obstacle::new(ObstacleFlags::SOLID | ObstacleFlags::PLAYER_BUILT, 10)
    }

    #[test]
    fn test_observers_each_get_their_own_queue() {
        let mut grid = ObstacleGrid::new(Layer::STRUCTURES);
        let a = grid.observe();
        grid.place(Coord::new(1, 1), wall());
        let b = grid.observe();
        grid.remove(Coord::new(1, 1));

        let seen_a = grid.take_changes(a);
        let seen_b = grid.take_changes(b);
        assert_eq!(seen_a.len(), 2);
        assert_eq!(seen_b.len(), 1, "Observer b registered after the placement");
        assert!(matches!(seen_b[0].kind, ObstacleChangeKind::Removed { .. }));
        assert_eq!(seen_b[0].layer, Layer::STRUCTURES);
        assert!(grid.take_changes(a).is_empty(), "Queue drains on take");
    }

    #[test]
    fn test_unobserve_frees_slot_for_reuse() {
        let mut grid = ObstacleGrid::default();
        let a = grid.observe();
        grid.unobserve(a);
        grid.place(Coord::ZERO, wall());
        let b = grid.observe();
        assert_eq!(a, b);
        assert!(grid.take_changes(b).is_empty());
    }

    #[test]
    fn test_flag_transitions_against_filter() {
        let mut grid = ObstacleGrid::default();
        let id = grid.observe();
        let c = Coord::new(3, 4);
        grid.place(c, Obstacle::new(ObstacleFlags::SOLID, 5));
        grid.set_flags(c, ObstacleFlags::SOLID | ObstacleFlags::PLAYER_BUILT);
        grid.set_flags(c, ObstacleFlags::SOLID);
        grid.set_flags(c, ObstacleFlags::SOLID);

        let transitions: Vec<_> = grid
            .take_changes(id)
            .iter()
            .map(|ch| ch.transition(ObstacleFlags::PLAYER_BUILT))
            .collect();
        assert_eq!(
            transitions,
            vec![
                FilterTransition::Unchanged,
                FilterTransition::Entered,
                FilterTransition::Left,
            ]
        );
    }

    #[test]
    fn test_damage_removes_at_zero_and_notifies() {
        let mut grid = ObstacleGrid::default();
        let id = grid.observe();
        let c = Coord::new(0, 2);
        grid.place(c, wall());
        assert_eq!(grid.damage(c, 4), Some(6));
        assert_eq!(grid.take_changes(id).len(), 1, "Damage alone does not notify");
        assert_eq!(grid.damage(c, 100), Some(0));
        assert!(!grid.contains(c));
        assert_eq!(grid.take_changes(id).len(), 1);
        assert_eq!(grid.damage(c, 1), None);
    }
}
