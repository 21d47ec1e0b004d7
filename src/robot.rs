//! Robot follower (component J, `spec.md` §4.J). Tracks the moving robot's
//! pose separately from the tree: the robot is almost never exactly on a
//! tree node, it's partway along a fresh edge from its actual pose to
//! whatever tree node it last locked onto. Grounded on
//! `datastructures.h`'s `RobotData` and `drrt.cpp`'s
//! `findNewTarget`/`moveRobot`, with the original's preallocated
//! fixed-size `robot_move_path`/`robot_local_path` matrices (sized to a
//! `MAXPATHNODES` constant, for a no-allocation real-time guarantee that
//! doesn't translate to this crate's allocator story) replaced by a
//! growable `Vec` recording the same history for `viz`.

use nalgebra::DVector;

use crate::edge::{Edge, EdgeKinematics};
use crate::ids::NodeId;
use crate::rrt::core::RrtxTree;

pub struct RobotData {
    pub pose: DVector<f64>,
    pub next_move_target: Option<NodeId>,
    /// The edge from the robot's pose (when it last locked on) to
    /// `next_move_target`; `move_robot` interpolates along this, not along
    /// the target's own parent edge, since the robot is rarely ever sitting
    /// exactly on a tree node.
    robot_edge_trajectory: Vec<DVector<f64>>,
    robot_edge_distance: f64,
    pub dist_along_edge: f64,
    pub time_along_edge: f64,
    pub moving: bool,
    /// Set by obstacle-change propagation when the node the robot was
    /// heading for gets orphaned (`spec.md` §4.I pass 3).
    pub current_move_invalid: bool,
    /// Positions visited so far, for `viz` (`spec.md` §10).
    pub path_taken: Vec<DVector<f64>>,
}

impl RobotData {
    pub fn new(start_pose: DVector<f64>) -> Self {
        RobotData {
            pose: start_pose.clone(),
            next_move_target: None,
            robot_edge_trajectory: Vec::new(),
            robot_edge_distance: 0.0,
            dist_along_edge: 0.0,
            time_along_edge: 0.0,
            moving: false,
            current_move_invalid: false,
            path_taken: vec![start_pose],
        }
    }

    /// `spec.md` §4.J `find_new_target`: search an expanding radius around
    /// the robot's current pose for the candidate minimizing
    /// `neighbor.lmc + edge.dist`, doubling the radius up to `max_radius`.
    /// If nothing is found, draws and inserts a fresh sample via `extend`
    /// and retries once. `next_move_target` and the edge it moves along are
    /// only ever written together, here, so a caller can never observe one
    /// updated without the other (`spec.md` §9 open question).
    pub fn find_new_target<K: EdgeKinematics>(
        &mut self,
        tree: &mut RrtxTree<K>,
        start_radius: f64,
        max_radius: f64,
        extend_delta: f64,
        move_goal: NodeId,
    ) -> bool {
        let mut radius = start_radius;
        loop {
            if let Some((target, edge)) = Self::best_candidate(tree, &self.pose, radius) {
                self.lock_onto(tree, target, edge);
                return true;
            }
            if radius >= max_radius {
                if tree.extend(self.pose.clone(), extend_delta, move_goal).is_none() {
                    return false;
                }
                if let Some((target, edge)) = Self::best_candidate(tree, &self.pose, max_radius) {
                    self.lock_onto(tree, target, edge);
                    return true;
                }
                return false;
            }
            radius *= 2.0;
        }
    }

    /// Transfers `is_move_goal` from the old target to the new one as one
    /// step together with the edge/target assignment, so a reader can never
    /// observe a target update without its matching edge (`spec.md` §9 open
    /// question on `findNewTarget`'s best-neighbor/edge pairing).
    fn lock_onto<K: EdgeKinematics>(&mut self, tree: &mut RrtxTree<K>, target: NodeId, edge: Edge) {
        if let Some(old) = self.next_move_target.take() {
            tree.nodes[old].is_move_goal = false;
        }
        tree.nodes[target].is_move_goal = true;
        self.next_move_target = Some(target);
        self.robot_edge_distance = edge.distance;
        self.robot_edge_trajectory = edge.trajectory;
        self.dist_along_edge = 0.0;
        self.time_along_edge = 0.0;
        self.current_move_invalid = false;
        self.moving = true;
    }

    fn best_candidate<K: EdgeKinematics>(tree: &RrtxTree<K>, pose: &DVector<f64>, radius: f64) -> Option<(NodeId, Edge)> {
        let candidates = tree.kdtree.find_within_range(&tree.nodes, pose, radius);
        let mut best: Option<(NodeId, Edge, f64)> = None;
        for cand in candidates {
            let cand_pos = tree.nodes[cand].position.clone();
            // `start`/`end` on this scratch edge are never used to index the
            // arena (the robot has no node id); only `distance`/`trajectory` matter.
            let edge = Edge::new(&tree.kinematics, cand, cand, pose, &cand_pos);
            if !edge.valid_move || tree.cspace.line_check(&edge.trajectory) {
                continue;
            }
            let trial = tree.nodes[cand].lmc + edge.distance;
            if trial.is_finite() && best.as_ref().map_or(true, |(_, _, b)| trial < *b) {
                best = Some((cand, edge, trial));
            }
        }
        best.map(|(id, edge, _)| (id, edge))
    }

    /// `spec.md` §4.J `move_robot`: advance the robot's pose by one time
    /// slice, hopping across as many tree edges as the slice covers
    /// (`drrt.cpp`'s `moveRobot` walks `R->robotEdge = nextNode->rrtParentEdge`
    /// in a loop for the same reason: a single slice can easily outrun one
    /// short edge once the tree is dense).
    ///
    /// Time convention for the time-aware branch (`spec.md` §9 open
    /// question): the robot's own clock counts down from its current time
    /// toward the root's time of zero, the same direction the tree's time
    /// dimension decreases along parent edges, so comparing
    /// `robot.pose[time] - slice_time` against a node's time coordinate is
    /// always a decreasing walk toward the root, never the reverse.
    pub fn move_robot<K: EdgeKinematics>(&mut self, tree: &mut RrtxTree<K>, slice_time: f64, robot_velocity: f64) {
        if !self.moving || self.current_move_invalid || self.robot_edge_trajectory.is_empty() {
            return;
        }
        if tree.cspace.has_time {
            let time_dim = self.pose.len() - 1;
            self.time_along_edge = self.pose[time_dim] - slice_time;
            self.pose = tree
                .kinematics
                .pose_at_time_along(&self.robot_edge_trajectory, self.time_along_edge);
            self.path_taken.push(self.pose.clone());
            return;
        }

        self.dist_along_edge += robot_velocity * slice_time;
        while self.dist_along_edge >= self.robot_edge_distance {
            let Some(target) = self.next_move_target else { break };
            if target == tree.root {
                // Reached the root (the navigation goal); nothing further to hop onto.
                self.dist_along_edge = self.robot_edge_distance;
                break;
            }
            let Some(parent_edge_id) = tree.nodes[target].parent_edge else {
                self.current_move_invalid = true;
                self.dist_along_edge = self.robot_edge_distance;
                break;
            };
            let edge = &tree.edges[parent_edge_id];
            if !edge.valid_move || tree.cspace.line_check(&edge.trajectory) {
                self.current_move_invalid = true;
                self.dist_along_edge = self.robot_edge_distance;
                break;
            }
            let leftover = self.dist_along_edge - self.robot_edge_distance;
            let new_target = edge.end;
            let new_distance = edge.distance;
            let new_trajectory = edge.trajectory.clone();
            tree.nodes[target].is_move_goal = false;
            tree.nodes[new_target].is_move_goal = true;
            self.next_move_target = Some(new_target);
            self.robot_edge_distance = new_distance;
            self.robot_edge_trajectory = new_trajectory;
            self.dist_along_edge = leftover;
        }
        self.pose = tree
            .kinematics
            .pose_at_dist_along(&self.robot_edge_trajectory, self.robot_edge_distance, self.dist_along_edge);
        self.path_taken.push(self.pose.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cspace::ConfigSpace;
    use crate::dubins::DubinsKinematics;
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
    fn find_new_target_locks_onto_a_nearby_tree_node() {
        let mut tree = small_tree();
        let root = tree.root;
        tree.extend(DVector::from_vec(vec![3.0, 0.0, 0.0]), 5.0, root).unwrap();
        let mut robot = RobotData::new(DVector::from_vec(vec![3.0, 0.1, 0.0]));
        let found = robot.find_new_target(&mut tree, 1.0, 8.0, 5.0, root);
        assert!(found);
        assert!(robot.next_move_target.is_some());
        assert!(robot.moving);
    }

    #[test]
    fn move_robot_does_nothing_when_not_moving() {
        let mut tree = small_tree();
        let mut robot = RobotData::new(DVector::from_vec(vec![0.0, 0.0, 0.0]));
        let before = robot.pose.clone();
        robot.move_robot(&mut tree, 0.1, 1.0);
        assert_eq!(robot.pose, before);
    }

    #[test]
    fn move_robot_advances_pose_toward_target_once_locked_on() {
        let mut tree = small_tree();
        let root = tree.root;
        tree.extend(DVector::from_vec(vec![3.0, 0.0, 0.0]), 5.0, root).unwrap();
        let mut robot = RobotData::new(DVector::from_vec(vec![0.0, 0.0, 0.0]));
        robot.find_new_target(&mut tree, 1.0, 8.0, 5.0, root);
        let before = robot.pose.clone();
        robot.move_robot(&mut tree, 0.5, 1.0);
        assert_ne!(robot.pose, before);
        assert!(!robot.path_taken.is_empty());
    }
}
