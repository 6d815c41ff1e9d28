//! Binary heap with a key → slot map, so any key can be removed in O(log n).
//!
//! `std::collections::BinaryHeap` only exposes the top element. Bounds tracking
//! needs to drop an arbitrary value once its last occurrence disappears, so this
//! heap keeps every key's current slot and repairs the heap around it.

use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Ordering policy for [`IndexedHeap`].
pub trait HeapOrder {
    /// True when `a` belongs closer to the top than `b`.
    fn precedes<K: Ord>(a: &K, b: &K) -> bool;
}

/// Smallest key on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinFirst;

/// Largest key on top.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFirst;

impl HeapOrder for MinFirst {
    fn precedes<K: Ord>(a: &K, b: &K) -> bool {
        a < b
    }
}

impl HeapOrder for MaxFirst {
    fn precedes<K: Ord>(a: &K, b: &K) -> bool {
        a > b
    }
}

/// Heap of distinct keys. Pushing a key that is already present is a no-op.
#[derive(Debug, Clone)]
pub struct IndexedHeap<K, O> {
    keys: Vec<K>,
    slots: FxHashMap<K, usize>,
    _order: PhantomData<O>,
}

impl<K, O> Default for IndexedHeap<K, O> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            slots: FxHashMap::default(),
            _order: PhantomData,
        }
    }
}

impl<K, O> IndexedHeap<K, O>
where
    K: Copy + Ord + Hash,
    O: HeapOrder,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn peek(&self) -> Option<K> {
        self.keys.first().copied()
    }

    /// Returns false when the key was already present.
    pub fn push(&mut self, key: K) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        let slot = self.keys.len();
        self.keys.push(key);
        self.slots.insert(key, slot);
        self.sift_up(slot);
        true
    }

    pub fn pop(&mut self) -> Option<K> {
        let top = self.peek()?;
        self.remove(&top);
        Some(top)
    }

    /// Removes `key` from anywhere in the heap. Returns false when absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.slots.remove(key) else {
            return false;
        };
        self.keys.swap_remove(slot);
        if slot < self.keys.len() {
            // The former last key now sits in `slot`; it may belong above or below.
            let moved = self.keys[slot];
            self.slots.insert(moved, slot);
            let settled = self.sift_up(slot);
            self.sift_down(settled);
        }
        true
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.keys.swap(a, b);
        self.slots.insert(self.keys[a], a);
        self.slots.insert(self.keys[b], b);
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !O::precedes(&self.keys[slot], &self.keys[parent]) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.keys.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut best = slot;
            if left < len && O::precedes(&self.keys[left], &self.keys[best]) {
                best = left;
            }
            if right < len && O::precedes(&self.keys[right], &self.keys[best]) {
                best = right;
            }
            if best == slot {
                break;
            }
            self.swap(slot, best);
            slot = best;
        }
    }

    /// Checks the heap property and the slot map. Test helper.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let heap_ok = (1..self.keys.len())
            .all(|i| !O::precedes(&self.keys[i], &self.keys[(i - 1) / 2]));
        let slots_ok = self.slots.len() == self.keys.len()
            && self.keys.iter().enumerate().all(|(i, k)| self.slots.get(k) == Some(&i));
        heap_ok && slots_ok
    }
}
