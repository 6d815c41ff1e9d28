//! Double-ended priority structure over a multiset.
//!
//! Each distinct key owns one node in a min-heap and one in a max-heap; the
//! multiplicity lives in a side table. Repeated inserts of the same key only
//! bump its count, and the heap nodes are dropped when the count reaches zero.
//!
//! | Operation          | Cost      |
//! |--------------------|-----------|
//! | `min` / `max`      | O(1)      |
//! | `insert` (new key) | O(log n)  |
//! | `insert` (dup key) | O(1)      |
//! | `remove` (last)    | O(log n)  |
//! | `remove` (dup)     | O(1)      |

use rustc_hash::FxHashMap;
use std::hash::Hash;

use super::indexed_heap::{IndexedHeap, MaxFirst, MinFirst};

/// What happened to a key on [`DoubleEndedHeap::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Key was not present.
    Absent,
    /// One occurrence removed; this many remain.
    Decremented(u32),
    /// Last occurrence removed; the key left both heaps.
    Emptied,
}

#[derive(Debug, Clone)]
pub struct DoubleEndedHeap<K> {
    low: IndexedHeap<K, MinFirst>,
    high: IndexedHeap<K, MaxFirst>,
    counts: FxHashMap<K, u32>,
    total: usize,
}

impl<K> Default for DoubleEndedHeap<K> {
    fn default() -> Self {
        Self {
            low: IndexedHeap::default(),
            high: IndexedHeap::default(),
            counts: FxHashMap::default(),
            total: 0,
        }
    }
}

impl<K> DoubleEndedHeap<K>
where
    K: Copy + Ord + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Number of occurrences, counting duplicates.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count(&self, key: &K) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn min(&self) -> Option<K> {
        self.low.peek()
    }

    pub fn max(&self) -> Option<K> {
        self.high.peek()
    }

    /// Adds one occurrence. Returns true when the key is new to the structure.
    pub fn insert(&mut self, key: K) -> bool {
        self.total += 1;
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        if *count > 1 {
            return false;
        }
        self.low.push(key);
        self.high.push(key);
        true
    }

    /// Removes one occurrence.
    pub fn remove(&mut self, key: &K) -> Removal {
        let Some(count) = self.counts.get_mut(key) else {
            return Removal::Absent;
        };
        self.total -= 1;
        *count -= 1;
        if *count > 0 {
            return Removal::Decremented(*count);
        }
        self.counts.remove(key);
        self.low.remove(key);
        self.high.remove(key);
        Removal::Emptied
    }

    /// Removes one occurrence of the smallest key.
    pub fn pop_min(&mut self) -> Option<K> {
        let key = self.min()?;
        self.remove(&key);
        Some(key)
    }

    /// Removes one occurrence of the largest key.
    pub fn pop_max(&mut self) -> Option<K> {
        let key = self.max()?;
        self.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.low.clear();
        self.high.clear();
        self.counts.clear();
        self.total = 0;
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.low.is_consistent()
            && self.high.is_consistent()
            && self.low.len() == self.counts.len()
            && self.high.len() == self.counts.len()
            && self.counts.values().map(|&c| c as usize).sum::<usize>() == self.total
    }
}
