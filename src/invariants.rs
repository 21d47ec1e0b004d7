//! Runtime invariant checks (`spec.md` §8 "Invariants (property-based)"),
//! wired to the `InconsistentGraph` error kind (`spec.md` §7): a violation
//! is a programming error, not a recoverable run-time outcome, so callers
//! `debug_assert!` on it in debug builds and merely log it in release
//! (`src/error.rs`'s doc comment states the same split).

use crate::edge::EdgeKinematics;
use crate::error::PlannerError;
use crate::rrt::core::RrtxTree;

/// Checks the invariants `spec.md` §3/§8 state must hold at any quiescent
/// point (after `reduce_inconsistency`, before the next `extend`): every
/// `parent_used` node's successor back-edge still resolves on its parent,
/// `lmc <= tree_cost` everywhere, and the root is fully consistent at zero
/// cost. Returns the first violation found, if any.
pub fn check<K: EdgeKinematics>(tree: &RrtxTree<K>) -> Result<(), PlannerError> {
    let root = tree.root;
    if tree.nodes[root].lmc != 0.0 || tree.nodes[root].tree_cost != 0.0 {
        return Err(PlannerError::InconsistentGraph(format!(
            "root must have lmc == tree_cost == 0, found lmc={} tree_cost={}",
            tree.nodes[root].lmc, tree.nodes[root].tree_cost
        )));
    }

    for (id, node) in tree.nodes.iter_enumerated() {
        if node.lmc > node.tree_cost {
            return Err(PlannerError::InconsistentGraph(format!(
                "node {id:?}: lmc ({}) > tree_cost ({})",
                node.lmc, node.tree_cost
            )));
        }

        if node.parent_used {
            let Some(handle) = node.successor_handle_in_parent else {
                return Err(PlannerError::InconsistentGraph(format!("node {id:?}: parent_used but no successor handle recorded")));
            };
            let Some(parent_edge_id) = node.parent_edge else {
                return Err(PlannerError::InconsistentGraph(format!("node {id:?}: parent_used but no parent_edge")));
            };
            let parent = tree.edges[parent_edge_id].end;
            let Some(back_edge_id) = tree.nodes[parent].successor_list.get(handle) else {
                return Err(PlannerError::InconsistentGraph(format!(
                    "node {id:?}: successor handle does not resolve on parent {parent:?}"
                )));
            };
            if tree.edges[back_edge_id].end != id {
                return Err(PlannerError::InconsistentGraph(format!(
                    "node {id:?}: parent's successor-list entry points at the wrong child"
                )));
            }
        }

        for edge_id in node.current_out.iter_front_to_back() {
            let edge = &tree.edges[edge_id];
            let Some(in_handle) = edge.handle_in_end_list else {
                return Err(PlannerError::InconsistentGraph(format!("edge {edge_id:?}: current-out entry has no matching current-in handle")));
            };
            match tree.nodes[edge.end].current_in.get(in_handle) {
                Some(e) if e == edge_id => {}
                _ => {
                    return Err(PlannerError::InconsistentGraph(format!(
                        "edge {edge_id:?}: current-in entry on {:?} does not reference this edge back",
                        edge.end
                    )))
                }
            }
        }
    }
    Ok(())
}

/// Runs `check`, `debug_assert!`-failing in debug builds and logging at
/// `error!` in release (`spec.md` §7's documented split for
/// `InconsistentGraph`). Call this at quiescent points in the main loop,
/// not mid-`extend`/`rewire` where the invariants are transiently broken.
pub fn assert_consistent<K: EdgeKinematics>(tree: &RrtxTree<K>) {
    if let Err(e) = check(tree) {
        debug_assert!(false, "{e}");
        log::error!("tree invariant violated: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cspace::ConfigSpace;
    use crate::dubins::DubinsKinematics;
    use nalgebra::DVector;
    use std::f64::consts::PI;

    fn small_tree() -> RrtxTree<DubinsKinematics> {
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
        RrtxTree::new(cspace, k, vec![None, None, Some(2.0 * PI)], 5.0)
    }

    #[test]
    fn a_freshly_built_tree_is_consistent() {
        let tree = small_tree();
        assert!(check(&tree).is_ok());
    }

    #[test]
    fn a_tree_after_extend_and_reduce_is_consistent() {
        let mut tree = small_tree();
        let root = tree.root;
        let id = tree.extend(DVector::from_vec(vec![3.0, 0.0, 0.0]), 5.0, root).unwrap();
        tree.reduce_inconsistency(id);
        assert!(check(&tree).is_ok());
    }
}
