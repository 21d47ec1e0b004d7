//! Obstacle-change propagation (component I, `spec.md` §4.I). Grounded on
//! `drrt.cpp`'s `propogateDescendants`: a 3-pass sweep over the orphan set
//! (OS) that first finds every descendant of a directly-invalidated node,
//! then spreads inconsistency outward to their remaining neighbors, then
//! actually severs each orphan from the tree.

use crate::edge::EdgeKinematics;
use crate::ids::NodeId;
use crate::neighbor_iter::out_neighbor_snapshot;
use crate::robot::RobotData;
use crate::rrt::core::RrtxTree;

/// Disconnects `invalidated` and every one of its descendants from the
/// tree, marking their out-neighbors inconsistent so `reduce_inconsistency`
/// repairs the tree around the hole. Call once per batch of obstacle
/// changes that invalidated existing edges, with `invalidated` being the
/// nodes whose parent edge now runs through the changed region.
pub fn propagate_descendants<K: EdgeKinematics>(tree: &mut RrtxTree<K>, invalidated: Vec<NodeId>, robot: &mut RobotData) {
    let mut os: Vec<NodeId> = Vec::new();
    for n in invalidated {
        if !tree.nodes[n].in_orphan_set {
            tree.nodes[n].in_orphan_set = true;
            os.push(n);
        }
    }

    // Pass 1: accumulate every descendant, back-to-front through successor
    // lists, so a node's children are always discovered before its
    // grandchildren.
    let mut i = 0;
    while i < os.len() {
        let node_id = os[i];
        let successors: Vec<_> = tree.nodes[node_id].successor_list.iter_back_to_front().collect();
        for edge_id in successors {
            let child = tree.edges[edge_id].end;
            if !tree.nodes[child].in_orphan_set {
                tree.nodes[child].in_orphan_set = true;
                os.push(child);
            }
        }
        i += 1;
    }

    // Pass 2: every orphan's out-neighbors not themselves orphaned become
    // inconsistent (their lmc, computed through an orphan, is no longer
    // trustworthy as a tree_cost); so does the orphan's own parent, unless
    // it's also about to be orphaned.
    for &node_id in &os {
        for edge_id in out_neighbor_snapshot(&tree.nodes[node_id]) {
            let neighbor = tree.edges[edge_id].end;
            if !tree.nodes[neighbor].in_orphan_set {
                tree.nodes[neighbor].tree_cost = f64::INFINITY;
                tree.verify_in_queue(neighbor);
            }
        }
        if let Some(parent) = tree.current_parent_of(node_id) {
            if !tree.nodes[parent].in_orphan_set {
                tree.verify_in_queue(parent);
            }
        }
    }

    // Pass 3: actually sever each orphan from the tree.
    for node_id in os {
        tree.nodes[node_id].in_orphan_set = false;
        tree.clear_parent(node_id);
        tree.nodes[node_id].tree_cost = f64::INFINITY;
        tree.nodes[node_id].lmc = f64::INFINITY;
        if robot.next_move_target == Some(node_id) {
            robot.current_move_invalid = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cspace::ConfigSpace;
    use crate::dubins::DubinsKinematics;
    use nalgebra::DVector;
    use std::f64::consts::PI;

    fn tree_with_chain() -> (RrtxTree<DubinsKinematics>, NodeId, NodeId) {
        let cspace = ConfigSpace::new(
            3,
            DVector::from_vec(vec![-10.0, -10.0, -PI]),
            DVector::from_vec(vec![10.0, 10.0, PI]),
            true,
            false,
            DVector::from_vec(vec![0.0, 0.0, 0.0]),
            DVector::from_vec(vec![0.0, 0.0, 0.0]),
            0.1,
            0.1,
            1.0,
            1.0,
            2.0,
            1e-6,
            None,
        );
        let k = DubinsKinematics { min_turn_radius: 0.5 };
        let mut tree = RrtxTree::new(cspace, k, vec![None, None, Some(2.0 * PI)], 8.0);
        let root = tree.root;
        let mid = tree.extend(DVector::from_vec(vec![2.0, 0.0, 0.0]), 5.0, root).unwrap();
        let leaf = tree.extend(DVector::from_vec(vec![4.0, 0.0, 0.0]), 5.0, root).unwrap();
        (tree, mid, leaf)
    }

    #[test]
    fn orphaning_a_node_disconnects_it_and_its_descendants() {
        let (mut tree, mid, leaf) = tree_with_chain();
        let mut robot = RobotData::new(DVector::from_vec(vec![4.0, 0.0, 0.0]));
        robot.next_move_target = Some(leaf);

        propagate_descendants(&mut tree, vec![mid], &mut robot);

        assert!(!tree.nodes[mid].parent_used);
        assert_eq!(tree.nodes[mid].lmc, f64::INFINITY);
        assert!(!tree.nodes[leaf].parent_used);
        assert_eq!(tree.nodes[leaf].lmc, f64::INFINITY);
        assert!(robot.current_move_invalid);
    }

    #[test]
    fn orphaning_is_idempotent_on_an_already_orphaned_node() {
        let (mut tree, mid, _leaf) = tree_with_chain();
        let mut robot = RobotData::new(DVector::from_vec(vec![0.0, 0.0, 0.0]));
        propagate_descendants(&mut tree, vec![mid], &mut robot);
        // Second call with the same (now already-disconnected) node must not panic.
        propagate_descendants(&mut tree, vec![mid], &mut robot);
        assert!(!tree.nodes[mid].parent_used);
    }
}
