//! Tree vertex (component of the data model, `spec.md` §3).

use nalgebra::DVector;

use crate::ids::{EdgeId, NodeId};
use crate::list::{IntrusiveList, ListHandle};

pub type NodeArena = index_vec::IndexVec<NodeId, Node>;

/// A vertex in the RRTx search tree and a leaf of the k-d spatial index.
///
/// Invariants (checked by `crate::invariants`, `spec.md` §8):
/// - if `parent_used` then `parent_edge`'s end node's `successor_list`
///   contains exactly one handle equal to `successor_handle_in_parent`.
/// - `lmc <= tree_cost`; equal means the node is *consistent*.
/// - the goal node has `lmc == tree_cost == 0.0`.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: DVector<f64>,

    /// Locally-minimum cost-to-goal via the best currently-known parent.
    pub lmc: f64,
    /// Cost-to-goal consistent with the tree edges actually in use.
    pub tree_cost: f64,

    pub parent_used: bool,
    pub parent_edge: Option<EdgeId>,

    pub kd_parent: Option<NodeId>,
    pub kd_left: Option<NodeId>,
    pub kd_right: Option<NodeId>,
    pub kd_split_dim: usize,

    /// Never shrinks: permanent record of neighbors at insertion time.
    pub initial_out: IntrusiveList<EdgeId>,
    pub initial_in: IntrusiveList<EdgeId>,
    /// Culled as the hyper-ball radius shrinks.
    pub current_out: IntrusiveList<EdgeId>,
    pub current_in: IntrusiveList<EdgeId>,

    /// Owning handles to zero-distance reverse edges, used only for
    /// back-tracking descendants during obstacle-change propagation.
    pub successor_list: IntrusiveList<EdgeId>,
    pub successor_handle_in_parent: Option<ListHandle>,

    pub in_orphan_set: bool,
    pub is_move_goal: bool,

    /// Scratch slot used by `find_best_parent` to stash the candidate edge
    /// from `new_node` to this node before it is known whether it's needed.
    pub temp_edge: Option<EdgeId>,

    /// Scratch flag for `find_more_within_range`: avoids double-inserting a
    /// node into a range result that is being incrementally extended.
    pub in_range_result: bool,
}

impl Node {
    pub fn new(position: DVector<f64>) -> Self {
        Node {
            position,
            lmc: f64::INFINITY,
            tree_cost: f64::INFINITY,
            parent_used: false,
            parent_edge: None,
            kd_parent: None,
            kd_left: None,
            kd_right: None,
            kd_split_dim: 0,
            initial_out: IntrusiveList::new(),
            initial_in: IntrusiveList::new(),
            current_out: IntrusiveList::new(),
            current_in: IntrusiveList::new(),
            successor_list: IntrusiveList::new(),
            successor_handle_in_parent: None,
            in_orphan_set: false,
            is_move_goal: false,
            temp_edge: None,
            in_range_result: false,
        }
    }

    /// A node that is fully consistent (used for the root/goal).
    pub fn new_root(position: DVector<f64>) -> Self {
        let mut n = Self::new(position);
        n.lmc = 0.0;
        n.tree_cost = 0.0;
        n
    }

    pub fn is_consistent(&self) -> bool {
        self.lmc == self.tree_cost
    }

    /// Heap key: lexicographic `(lmc, tree_cost)` per `spec.md` §4.H.
    pub fn heap_key(&self) -> (ordered_float::OrderedFloat<f64>, ordered_float::OrderedFloat<f64>) {
        (
            ordered_float::OrderedFloat(self.lmc),
            ordered_float::OrderedFloat(self.tree_cost),
        )
    }
}
