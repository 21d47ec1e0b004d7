//! Edge abstraction (component D) and its external kinematics contract.
//!
//! `spec.md` §6 deliberately keeps the concrete trajectory generation and
//! collision narrow-phase out of the core, specified only by interface.
//! `EdgeKinematics` is that interface; `Edge` is the data the core actually
//! walks (distance, validity, a sampled trajectory for interpolation).
//! Edges are directional — for a Dubins car the reverse of an edge is not
//! the same edge — so `start`/`end` are never swapped implicitly anywhere
//! in this crate.

use nalgebra::DVector;

use crate::ids::NodeId;
use crate::list::ListHandle;

pub type EdgeArena = index_vec::IndexVec<crate::ids::EdgeId, Edge>;

/// External collaborator: trajectory generation and kinematic feasibility
/// for one edge. `spec.md` §6 "Edge kinematics (consumed)". Concrete
/// implementations live in `crate::dubins`.
pub trait EdgeKinematics {
    /// Cost/length of the feasible trajectory from `a` to `b`, or `f64::INFINITY`
    /// if no such trajectory exists under this model's constraints.
    fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64;

    /// Sampled points along the trajectory from `a` to `b`, for interpolation
    /// and line-sweep collision checking. Empty/degenerate if infeasible.
    fn trajectory(&self, a: &DVector<f64>, b: &DVector<f64>) -> Vec<DVector<f64>>;

    /// A zero-motion edge for the time dimension (`spec.md` §4.D).
    fn hover_trajectory(&self, a: &DVector<f64>) -> Vec<DVector<f64>>;

    /// Is the straight-line/kinematic move from `a` to `b` feasible at all
    /// (independent of obstacles)?
    fn valid_move(&self, a: &DVector<f64>, b: &DVector<f64>) -> bool;

    fn pose_at_dist_along(&self, trajectory: &[DVector<f64>], total_dist: f64, dist: f64) -> DVector<f64>;
    fn pose_at_time_along(&self, trajectory: &[DVector<f64>], time: f64) -> DVector<f64>;

    /// Shorten `point` toward `toward` so the step is at most `delta`, given
    /// the already-computed `dist` between them (`spec.md` §4.D saturation).
    fn saturate(&self, point: &mut DVector<f64>, toward: &DVector<f64>, delta: f64, dist: f64);
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub start: NodeId,
    pub end: NodeId,
    /// `f64::INFINITY` if invalid (infeasible kinematics or in collision).
    pub distance: f64,
    pub trajectory: Vec<DVector<f64>>,
    pub valid_move: bool,

    /// This edge's position in `start`'s `current_out` list, if it is
    /// currently registered as a current-neighbor edge.
    pub handle_in_start_list: Option<ListHandle>,
    /// This edge's position in `end`'s `current_in` list.
    pub handle_in_end_list: Option<ListHandle>,
}

impl Edge {
    pub fn new<K: EdgeKinematics + ?Sized>(
        kinematics: &K,
        start: NodeId,
        end: NodeId,
        start_pos: &DVector<f64>,
        end_pos: &DVector<f64>,
    ) -> Self {
        let valid_move = kinematics.valid_move(start_pos, end_pos);
        let trajectory = if valid_move {
            kinematics.trajectory(start_pos, end_pos)
        } else {
            Vec::new()
        };
        let distance = if valid_move {
            kinematics.distance(start_pos, end_pos)
        } else {
            f64::INFINITY
        };
        Edge {
            start,
            end,
            distance,
            trajectory,
            valid_move,
            handle_in_start_list: None,
            handle_in_end_list: None,
        }
    }

    /// A self-edge of infinite distance, used to clear a node's parent link
    /// during orphaning (`spec.md` §4.I step 3).
    pub fn self_infinite(node: NodeId) -> Self {
        Edge {
            start: node,
            end: node,
            distance: f64::INFINITY,
            trajectory: Vec::new(),
            valid_move: false,
            handle_in_start_list: None,
            handle_in_end_list: None,
        }
    }

    /// A zero-distance back-edge placed on a successor list; never used for
    /// movement, only to track descendants (`spec.md` §4.H `make_parent_of`).
    pub fn back_edge(parent: NodeId, child: NodeId) -> Self {
        Edge {
            start: parent,
            end: child,
            distance: 0.0,
            trajectory: Vec::new(),
            valid_move: true,
            handle_in_start_list: None,
            handle_in_end_list: None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.distance.is_finite()
    }
}
