//! Binary min-heap with key-swap tracking (component B).
//!
//! Keyed explicitly by the caller rather than via a stored comparator
//! closure: `add`/`update` take the key to use, computed from whatever
//! fields the caller cares about at that moment (`(lmc, tree_cost)` for
//! RRTx, a scalar `g + h` for Theta*). Each entry remembers its own index
//! in the backing array so `update`/`remove`/`marked` are all O(log n) (or
//! O(1) for `marked`) instead of needing a linear scan.

use std::collections::HashMap;
use std::hash::Hash;

pub struct BinaryHeap<T, K> {
    entries: Vec<(T, K)>,
    index_of: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash, K: Ord + Copy> Default for BinaryHeap<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash, K: Ord + Copy> BinaryHeap<T, K> {
    pub fn new() -> Self {
        BinaryHeap {
            entries: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Is `item` currently present in the heap?
    pub fn marked(&self, item: T) -> bool {
        self.index_of.contains_key(&item)
    }

    pub fn top(&self) -> Option<(T, K)> {
        self.entries.first().copied()
    }

    /// Insert `item` with the given key, or re-sift if it is already present.
    pub fn add(&mut self, item: T, key: K) {
        if self.marked(item) {
            self.update(item, key);
            return;
        }
        let idx = self.entries.len();
        self.entries.push((item, key));
        self.index_of.insert(item, idx);
        self.sift_up(idx);
    }

    /// Re-sift `item` after its key changed externally. A no-op if `item`
    /// is not currently in the heap (per the design notes: the caller is
    /// expected to fall back to `add` in that case).
    pub fn update(&mut self, item: T, new_key: K) {
        let Some(&idx) = self.index_of.get(&item) else {
            return;
        };
        self.entries[idx].1 = new_key;
        let moved_down = self.sift_down(idx);
        if !moved_down {
            self.sift_up(idx);
        }
    }

    pub fn remove(&mut self, item: T) -> bool {
        let Some(&idx) = self.index_of.get(&item) else {
            return false;
        };
        let last = self.entries.len() - 1;
        self.swap(idx, last);
        self.entries.pop();
        self.index_of.remove(&item);
        if idx < self.entries.len() {
            if !self.sift_down(idx) {
                self.sift_up(idx);
            }
        }
        true
    }

    pub fn pop(&mut self) -> Option<(T, K)> {
        if self.entries.is_empty() {
            return None;
        }
        let top = self.entries[0];
        let last = self.entries.len() - 1;
        self.swap(0, last);
        self.entries.pop();
        self.index_of.remove(&top.0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.index_of.insert(self.entries[a].0, a);
        self.index_of.insert(self.entries[b].0, b);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.entries[idx].1 < self.entries[parent].1 {
                self.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    /// Returns true if the entry at `idx` moved further down the heap.
    fn sift_down(&mut self, mut idx: usize) -> bool {
        let start = idx;
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut smallest = idx;
            if left < self.entries.len() && self.entries[left].1 < self.entries[smallest].1 {
                smallest = left;
            }
            if right < self.entries.len() && self.entries[right].1 < self.entries[smallest].1 {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.swap(idx, smallest);
            idx = smallest;
        }
        idx != start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_key_order() {
        let mut h: BinaryHeap<u32, i32> = BinaryHeap::new();
        h.add(1, 5);
        h.add(2, 1);
        h.add(3, 3);
        assert_eq!(h.pop(), Some((2, 1)));
        assert_eq!(h.pop(), Some((3, 3)));
        assert_eq!(h.pop(), Some((1, 5)));
        assert_eq!(h.pop(), None);
    }

    #[test]
    fn update_resifts_after_key_change() {
        let mut h: BinaryHeap<u32, i32> = BinaryHeap::new();
        h.add(1, 10);
        h.add(2, 20);
        h.add(3, 30);
        h.update(3, 0);
        assert_eq!(h.pop(), Some((3, 0)));
        assert!(!h.marked(3));
    }

    #[test]
    fn update_on_absent_item_is_noop() {
        let mut h: BinaryHeap<u32, i32> = BinaryHeap::new();
        h.update(99, -100);
        assert!(h.is_empty());
    }

    #[test]
    fn remove_arbitrary_element() {
        let mut h: BinaryHeap<u32, i32> = BinaryHeap::new();
        h.add(1, 1);
        h.add(2, 2);
        h.add(3, 3);
        assert!(h.remove(2));
        assert!(!h.marked(2));
        let mut popped = vec![];
        while let Some((t, _)) = h.pop() {
            popped.push(t);
        }
        assert_eq!(popped, vec![1, 3]);
    }

    #[test]
    fn marked_reflects_membership() {
        let mut h: BinaryHeap<u32, i32> = BinaryHeap::new();
        assert!(!h.marked(1));
        h.add(1, 1);
        assert!(h.marked(1));
        h.pop();
        assert!(!h.marked(1));
    }
}
