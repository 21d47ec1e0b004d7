//! Configuration space: bounds, start/goal, obstacle registry, and the
//! handful of planner-wide knobs that don't belong to any one node or edge
//! (component E, `spec.md` §3/§4.E).
//!
//! The obstacle registry and the sample stack are the two pieces of state
//! the planner thread and an obstacle-update thread can touch concurrently
//! (`spec.md` §9 concurrency notes); both live behind one coarse mutex,
//! mirroring the original's single `cspace_mutex_` rather than splitting
//! into finer-grained locks.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use nalgebra::DVector;

use crate::collision::{CollisionChecker, DefaultCollisionChecker, Obstacle, ObstacleId};

struct Mutable {
    collision: DefaultCollisionChecker,
    /// Samples queued by obstacle-change propagation for reuse instead of
    /// drawing fresh ones (`spec.md` §4.F `rand_node_or_from_stack`).
    sample_stack: Vec<DVector<f64>>,
}

pub struct ConfigSpace {
    pub num_dimensions: usize,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub has_theta: bool,
    pub has_time: bool,

    pub start: DVector<f64>,
    pub goal: DVector<f64>,

    /// Probability that a drawn sample is replaced by the goal outright
    /// (`spec.md` §4.F `rand_node_or_goal`).
    pub prob_goal: f64,

    pub robot_radius: f64,
    pub robot_velocity: f64,
    pub dubins_min_velocity: f64,
    pub dubins_max_velocity: f64,

    /// Minimum `tree_cost - lmc` improvement that triggers requeueing a
    /// node (`spec.md` §4.H).
    pub change_thresh: f64,

    mutable: Mutex<Mutable>,
    warmup_deadline: Option<Instant>,
}

impl ConfigSpace {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_dimensions: usize,
        lower: DVector<f64>,
        upper: DVector<f64>,
        has_theta: bool,
        has_time: bool,
        start: DVector<f64>,
        goal: DVector<f64>,
        prob_goal: f64,
        robot_radius: f64,
        robot_velocity: f64,
        dubins_min_velocity: f64,
        dubins_max_velocity: f64,
        change_thresh: f64,
        warmup_time: Option<Duration>,
    ) -> Self {
        ConfigSpace {
            num_dimensions,
            lower,
            upper,
            has_theta,
            has_time,
            start,
            goal,
            prob_goal,
            robot_radius,
            robot_velocity,
            dubins_min_velocity,
            dubins_max_velocity,
            change_thresh,
            mutable: Mutex::new(Mutable {
                collision: DefaultCollisionChecker::new(),
                sample_stack: Vec::new(),
            }),
            warmup_deadline: warmup_time.map(|d| Instant::now() + d),
        }
    }

    pub fn in_bounds(&self, p: &DVector<f64>) -> bool {
        (0..self.num_dimensions).all(|i| p[i] >= self.lower[i] && p[i] <= self.upper[i])
    }

    pub fn point_in_collision(&self, p: &DVector<f64>) -> bool {
        if self.in_warmup_time() {
            return false;
        }
        let guard = self.mutable.lock().unwrap();
        guard.collision.point_in_collision(p, self.robot_radius)
    }

    /// `spec.md` §4.E `line_check`: is any point along this sampled
    /// trajectory in collision? Honors the warm-up window the same way
    /// `point_in_collision` does: while warming up, every check is free so
    /// the graph can form before obstacles start pruning it.
    pub fn line_check(&self, trajectory: &[DVector<f64>]) -> bool {
        if self.in_warmup_time() {
            return false;
        }
        let guard = self.mutable.lock().unwrap();
        guard.collision.trajectory_in_collision(trajectory, self.robot_radius)
    }

    pub fn add_obstacle(&self, obstacle: Obstacle) -> ObstacleId {
        let mut guard = self.mutable.lock().unwrap();
        guard.collision.add_obstacle(obstacle)
    }

    pub fn remove_obstacle(&self, id: ObstacleId) -> Option<Obstacle> {
        let mut guard = self.mutable.lock().unwrap();
        guard.collision.remove_obstacle(id)
    }

    /// Bumped on every `add_obstacle`/`remove_obstacle`; the main loop polls
    /// this instead of diffing the registry to notice an obstacle change
    /// (`spec.md` §5 "obstacle apply" step).
    pub fn obstacle_version(&self) -> u64 {
        self.mutable.lock().unwrap().collision.version()
    }

    pub fn push_sample(&self, p: DVector<f64>) {
        self.mutable.lock().unwrap().sample_stack.push(p);
    }

    pub fn pop_sample(&self) -> Option<DVector<f64>> {
        self.mutable.lock().unwrap().sample_stack.pop()
    }

    pub fn in_warmup_time(&self) -> bool {
        self.warmup_deadline.map_or(false, |deadline| Instant::now() < deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cspace() -> ConfigSpace {
        ConfigSpace::new(
            2,
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![10.0, 10.0]),
            false,
            false,
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![10.0, 10.0]),
            0.1,
            0.2,
            1.0,
            1.0,
            2.0,
            1e-6,
            None,
        )
    }

    #[test]
    fn bounds_check_rejects_outside_points() {
        let cs = make_cspace();
        assert!(cs.in_bounds(&DVector::from_vec(vec![5.0, 5.0])));
        assert!(!cs.in_bounds(&DVector::from_vec(vec![-1.0, 5.0])));
        assert!(!cs.in_bounds(&DVector::from_vec(vec![5.0, 11.0])));
    }

    #[test]
    fn obstacle_add_and_remove_round_trips_through_point_in_collision() {
        let cs = make_cspace();
        let p = DVector::from_vec(vec![5.0, 5.0]);
        assert!(!cs.point_in_collision(&p));
        let id = cs.add_obstacle(Obstacle::Circle { center: (5.0, 5.0), radius: 1.0 });
        assert!(cs.point_in_collision(&p));
        cs.remove_obstacle(id);
        assert!(!cs.point_in_collision(&p));
    }

    #[test]
    fn sample_stack_is_lifo() {
        let cs = make_cspace();
        assert!(cs.pop_sample().is_none());
        cs.push_sample(DVector::from_vec(vec![1.0, 1.0]));
        cs.push_sample(DVector::from_vec(vec![2.0, 2.0]));
        assert_eq!(cs.pop_sample(), Some(DVector::from_vec(vec![2.0, 2.0])));
        assert_eq!(cs.pop_sample(), Some(DVector::from_vec(vec![1.0, 1.0])));
    }

    #[test]
    fn with_no_warmup_configured_warmup_is_never_active() {
        let cs = make_cspace();
        assert!(!cs.in_warmup_time());
    }

    #[test]
    fn warmup_deadline_in_the_future_reports_active() {
        let mut cs = make_cspace();
        cs.warmup_deadline = Some(Instant::now() + Duration::from_secs(60));
        assert!(cs.in_warmup_time());
    }

    #[test]
    fn collision_checks_are_suppressed_during_warmup() {
        let mut cs = make_cspace();
        cs.add_obstacle(Obstacle::Circle { center: (5.0, 5.0), radius: 1.0 });
        cs.warmup_deadline = Some(Instant::now() + Duration::from_secs(60));
        assert!(!cs.point_in_collision(&DVector::from_vec(vec![5.0, 5.0])));
        cs.warmup_deadline = None;
        assert!(cs.point_in_collision(&DVector::from_vec(vec![5.0, 5.0])));
    }
}
