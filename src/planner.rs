//! Main loop (component L, `spec.md` §4.L / §5): a `Planner` trait plus a
//! `PlannerBasic` implementation, splitting the thin trait from its one
//! concrete driver. Each `step()` call is one time
//! slice and performs, in the order `spec.md` §5 fixes: sample, extend,
//! reduce_inconsistency, obstacle apply, propagate_descendants,
//! reduce_inconsistency, move_robot.

use nalgebra::DVector;
use rand::rngs::ThreadRng;

use crate::cspace::ConfigSpace;
use crate::edge::EdgeKinematics;
use crate::ids::NodeId;
use crate::instrumentation::{SliceStats, Timer};
use crate::robot::RobotData;
use crate::rrt::core::RrtxTree;
use crate::rrt::propagate::propagate_descendants;
use crate::sampler::{Sampler, SamplerPolicy};

/// What a caller (the CLI main loop, or a test) needs to drive and observe
/// a planner run without depending on `PlannerBasic`'s concrete type.
pub trait Planner {
    fn step(&mut self) -> SliceStats;
    fn robot_pose(&self) -> &DVector<f64>;
    fn reached_goal(&self) -> bool;
    fn tree_size(&self) -> usize;
}

pub struct PlannerBasic<K: EdgeKinematics> {
    pub tree: RrtxTree<K>,
    pub robot: RobotData,
    sampler: Sampler,
    rng: ThreadRng,
    delta: f64,
    ball_constant: f64,
    slice_time: f64,
    last_obstacle_version: u64,
}

impl<K: EdgeKinematics> PlannerBasic<K> {
    /// `sampler_policy` picks one of the five `rand_node_*` variants at
    /// construction (`spec.md` §4.F). `theta_cell_size`, if given and the
    /// space carries a heading, runs a Theta* bootstrap once up front and
    /// biases the sampler's goal-ward heading draws toward it
    /// (`SPEC_FULL.md` §10); `None` skips the bootstrap entirely.
    pub fn new(
        cspace: ConfigSpace,
        kinematics: K,
        wrap_dims: Vec<Option<f64>>,
        delta: f64,
        ball_constant: f64,
        slice_time: f64,
        sampler_policy: SamplerPolicy,
        theta_cell_size: Option<f64>,
    ) -> Self {
        let has_time = cspace.has_time;
        let start = cspace.start.clone();
        let initial_ball = ball_constant;
        let mut tree = RrtxTree::new(cspace, kinematics, wrap_dims, initial_ball);
        if has_time {
            tree.add_other_times_to_root(16, slice_time);
        }
        let last_obstacle_version = tree.cspace.obstacle_version();

        let mut sampler = Sampler::new(sampler_policy, 0, std::time::Duration::from_secs(3600));
        if let Some(cell_size) = theta_cell_size {
            if tree.cspace.has_theta {
                if let Some(result) = crate::theta_star::run(&tree.cspace, cell_size) {
                    sampler = sampler.with_theta_bias(result, 0.5);
                }
            }
        }

        PlannerBasic {
            tree,
            robot: RobotData::new(start),
            sampler,
            rng: rand::thread_rng(),
            delta,
            ball_constant,
            slice_time,
            last_obstacle_version,
        }
    }

    /// `r_ball = ball_constant * (log n / n)^(1/d)`, the shrinking hyper-ball
    /// radius (`spec.md` GLOSSARY). Clamped so it never collapses below
    /// `delta`, which would make `extend` unable to find any candidate parent.
    fn hyper_ball_radius(&self) -> f64 {
        let n = (self.tree.nodes.len() as f64).max(2.0);
        let d = self.tree.cspace.num_dimensions as f64;
        let r = self.ball_constant * (n.ln() / n).powf(1.0 / d);
        r.max(self.delta)
    }

    /// `spec.md` §5 "obstacle apply": nodes whose parent edge now crosses a
    /// changed obstacle. Re-checks every current parent edge's trajectory;
    /// `O(V)` per call, acceptable since it only runs when
    /// `cspace.obstacle_version()` has actually moved.
    fn invalidated_by_obstacles(&self) -> Vec<NodeId> {
        let mut invalid = Vec::new();
        for (id, node) in self.tree.nodes.iter_enumerated() {
            if !node.parent_used {
                continue;
            }
            let Some(edge_id) = node.parent_edge else { continue };
            let edge = &self.tree.edges[edge_id];
            if edge.start == edge.end {
                continue; // self/back-edges are never spatial moves
            }
            if self.tree.cspace.line_check(&edge.trajectory) {
                invalid.push(id);
            }
        }
        invalid
    }

    fn reduce_target(&self) -> NodeId {
        self.robot.next_move_target.unwrap_or(self.tree.root)
    }

    /// Cap on `find_new_target`'s doubling search radius (`spec.md` §4.J):
    /// the straight-line diagonal of the bounded region, beyond which there
    /// is nothing left to find.
    fn region_diameter(&self) -> f64 {
        let lower = &self.tree.cspace.lower;
        let upper = &self.tree.cspace.upper;
        let dx = upper[0] - lower[0];
        let dy = upper[1] - lower[1];
        (dx * dx + dy * dy).sqrt()
    }
}

impl<K: EdgeKinematics> Planner for PlannerBasic<K> {
    fn step(&mut self) -> SliceStats {
        let mut stats = SliceStats::default();

        let mut t = Timer::default();
        let sample = self.sampler.sample(&self.tree.cspace, &mut self.rng);
        stats.sample_ms = t.dur_ms();

        t.restart();
        self.tree.hyper_ball_rad = self.hyper_ball_radius();
        self.tree.extend(sample, self.delta, self.reduce_target());
        stats.extend_ms = t.dur_ms();

        t.restart();
        self.tree.reduce_inconsistency(self.reduce_target());
        stats.reduce_ms = t.dur_ms();

        t.restart();
        let current_version = self.tree.cspace.obstacle_version();
        if current_version != self.last_obstacle_version {
            let invalid = self.invalidated_by_obstacles();
            if !invalid.is_empty() {
                propagate_descendants(&mut self.tree, invalid, &mut self.robot);
                self.tree.reduce_inconsistency(self.reduce_target());
            }
            self.last_obstacle_version = current_version;
        }
        stats.obstacle_ms = t.dur_ms();

        t.restart();
        if self.robot.next_move_target.is_none() || self.robot.current_move_invalid {
            let cap = self.region_diameter();
            let move_goal = self.reduce_target();
            self.robot.find_new_target(&mut self.tree, self.tree.hyper_ball_rad, cap, self.delta, move_goal);
        }
        let robot_velocity = self.tree.cspace.robot_velocity;
        self.robot.move_robot(&mut self.tree, self.slice_time, robot_velocity);
        stats.move_ms = t.dur_ms();

        crate::invariants::assert_consistent(&self.tree);
        stats
    }

    fn robot_pose(&self) -> &DVector<f64> {
        &self.robot.pose
    }

    fn reached_goal(&self) -> bool {
        let goal = &self.tree.cspace.goal;
        let pose = &self.robot.pose;
        let dx = pose[0] - goal[0];
        let dy = pose[1] - goal[1];
        (dx * dx + dy * dy).sqrt() <= self.tree.cspace.robot_radius
    }

    fn tree_size(&self) -> usize {
        self.tree.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dubins::DubinsKinematics;
    use std::f64::consts::PI;

    fn cspace() -> ConfigSpace {
        ConfigSpace::new(
            3,
            DVector::from_vec(vec![-2.0, -2.0, -PI]),
            DVector::from_vec(vec![2.0, 2.0, PI]),
            true,
            false,
            DVector::from_vec(vec![-1.5, -1.5, 0.0]),
            DVector::from_vec(vec![1.5, 1.5, 0.0]),
            0.3,
            0.2,
            1.0,
            1.0,
            2.0,
            1e-6,
            None,
        )
    }

    #[test]
    fn repeated_steps_grow_the_tree_and_move_the_robot() {
        let k = DubinsKinematics { min_turn_radius: 0.3 };
        let mut planner = PlannerBasic::new(cspace(), k, crate::config::wrap_dims(3), 1.0, 3.0, 0.25, SamplerPolicy::OrFromStack, None);
        let start_pose = planner.robot_pose().clone();
        for _ in 0..200 {
            planner.step();
        }
        assert!(planner.tree_size() > 1);
        assert_ne!(planner.robot_pose(), &start_pose);
    }
}
