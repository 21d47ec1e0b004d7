//! Unified neighbor enumeration (`spec.md` §4.G `next_out_neighbor` /
//! `next_in_neighbor`).
//!
//! The original walks one cursor through the initial list then the
//! current list in place, via a three-state flag, relying on `shared_ptr`
//! aliasing so the same edge object can sit in two lists simultaneously.
//! An arena can't alias that way while the caller mutates node/edge
//! entries mid-walk, so this snapshots both lists up front into one
//! deduplicated, owned `Vec<EdgeId>` instead: everything in the permanent
//! initial list, plus anything still registered in the current
//! (radius-culled) list.

use std::collections::HashSet;

use crate::ids::EdgeId;
use crate::list::ListHandle;
use crate::node::Node;

pub fn out_neighbor_snapshot(node: &Node) -> Vec<EdgeId> {
    collect_unique(node.initial_out.iter_front_to_back(), node.current_out.iter_front_to_back())
}

pub fn in_neighbor_snapshot(node: &Node) -> Vec<EdgeId> {
    collect_unique(node.initial_in.iter_front_to_back(), node.current_in.iter_front_to_back())
}

fn collect_unique(a: impl Iterator<Item = EdgeId>, b: impl Iterator<Item = EdgeId>) -> Vec<EdgeId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for e in a.chain(b) {
        if seen.insert(e) {
            out.push(e);
        }
    }
    out
}

/// `(handle, edge)` pairs from the current-out list, for `cull_current_neighbors`
/// to decide removal by distance and then remove by handle in O(1).
pub fn current_out_entries(node: &Node) -> Vec<(ListHandle, EdgeId)> {
    node.current_out
        .handles_front_to_back()
        .map(|h| (h, node.current_out.get(h).expect("handle from this list")))
        .collect()
}

pub fn current_in_entries(node: &Node) -> Vec<(ListHandle, EdgeId)> {
    node.current_in
        .handles_front_to_back()
        .map(|h| (h, node.current_in.get(h).expect("handle from this list")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn leaf() -> Node {
        Node::new(DVector::from_vec(vec![0.0, 0.0]))
    }

    #[test]
    fn snapshot_deduplicates_an_edge_present_in_both_lists() {
        use crate::node::Node;
        let mut n = leaf();
        let e = EdgeId::new(3);
        n.initial_out.push_front(e);
        n.current_out.push_front(e);
        let snap = out_neighbor_snapshot(&n);
        assert_eq!(snap, vec![e]);
    }

    #[test]
    fn snapshot_includes_initial_only_entries() {
        let mut n = leaf();
        let culled = EdgeId::new(1);
        n.initial_out.push_front(culled); // culled from current but still initial
        let snap = out_neighbor_snapshot(&n);
        assert_eq!(snap, vec![culled]);
    }

    #[test]
    fn current_out_entries_pairs_handles_with_edge_ids() {
        let mut n = leaf();
        let e = EdgeId::new(7);
        let h = n.current_out.push_front(e);
        let entries = current_out_entries(&n);
        assert_eq!(entries, vec![(h, e)]);
    }
}
