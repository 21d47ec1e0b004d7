//! Default collision backend (component E's other named external
//! collaborator, given a concrete body — see `dubins.rs` header for the
//! same rationale). Only the first two position dimensions (x, y) ever
//! participate in collision: heading and time are kinematic/temporal, not
//! spatial, so they never add clearance or overlap.

use nalgebra::DVector;

/// External collaborator: is a point or a trajectory in collision?
/// `spec.md` §6 "Collision checking (consumed)".
pub trait CollisionChecker {
    fn point_in_collision(&self, p: &DVector<f64>, robot_radius: f64) -> bool;

    /// Default narrow phase: check every sample point on the trajectory.
    /// A consumer with a real physics backend (e.g. a continuous
    /// conservative-advancement sweep) overrides this directly.
    fn trajectory_in_collision(&self, trajectory: &[DVector<f64>], robot_radius: f64) -> bool {
        trajectory.iter().any(|p| self.point_in_collision(p, robot_radius))
    }
}

#[derive(Debug, Clone)]
pub enum Obstacle {
    Circle { center: (f64, f64), radius: f64 },
    Aabb { min: (f64, f64), max: (f64, f64) },
}

impl Obstacle {
    fn distance_to_point(&self, p: (f64, f64)) -> f64 {
        match self {
            Obstacle::Circle { center, radius } => {
                let dx = p.0 - center.0;
                let dy = p.1 - center.1;
                (dx * dx + dy * dy).sqrt() - radius
            }
            Obstacle::Aabb { min, max } => {
                let dx = (min.0 - p.0).max(0.0).max(p.0 - max.0);
                let dy = (min.1 - p.1).max(0.0).max(p.1 - max.1);
                if dx == 0.0 && dy == 0.0 {
                    // Inside: negative distance, magnitude is distance to nearest edge.
                    -((p.0 - min.0).min(max.0 - p.0)).min((p.1 - min.1).min(max.1 - p.1))
                } else {
                    (dx * dx + dy * dy).sqrt()
                }
            }
        }
    }
}

/// Obstacle registry backing `ConfigSpace`'s collision queries. Obstacles
/// can be added and removed at runtime (`spec.md` §4.E `add_obstacle` /
/// `remove_obstacle`); removal does not shrink `obstacles`, it only clears
/// the slot, so `ObstacleId`s stay stable.
#[derive(Debug, Clone, Default)]
pub struct DefaultCollisionChecker {
    obstacles: Vec<Option<Obstacle>>,
    /// Bumped on every add/remove so callers (the main loop's obstacle-change
    /// scan) can tell whether the registry moved since they last looked,
    /// instead of re-scanning every edge on every iteration.
    version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleId(pub usize);

impl DefaultCollisionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> ObstacleId {
        let id = self.obstacles.len();
        self.obstacles.push(Some(obstacle));
        self.version += 1;
        ObstacleId(id)
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let removed = self.obstacles.get_mut(id.0).and_then(|slot| slot.take());
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|o| (ObstacleId(i), o)))
    }
}

impl CollisionChecker for DefaultCollisionChecker {
    fn point_in_collision(&self, p: &DVector<f64>, robot_radius: f64) -> bool {
        let xy = (p[0], p[1]);
        self.obstacles
            .iter()
            .flatten()
            .any(|o| o.distance_to_point(xy) <= robot_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_inside_circle_obstacle_collides() {
        let mut cc = DefaultCollisionChecker::new();
        cc.add_obstacle(Obstacle::Circle { center: (0.0, 0.0), radius: 1.0 });
        assert!(cc.point_in_collision(&DVector::from_vec(vec![0.5, 0.0]), 0.0));
        assert!(!cc.point_in_collision(&DVector::from_vec(vec![5.0, 0.0]), 0.0));
    }

    #[test]
    fn robot_radius_inflates_clearance() {
        let mut cc = DefaultCollisionChecker::new();
        cc.add_obstacle(Obstacle::Circle { center: (0.0, 0.0), radius: 1.0 });
        assert!(cc.point_in_collision(&DVector::from_vec(vec![1.4, 0.0]), 0.2));
        assert!(!cc.point_in_collision(&DVector::from_vec(vec![1.4, 0.0]), 0.0));
    }

    #[test]
    fn removed_obstacle_no_longer_collides_and_id_is_stable() {
        let mut cc = DefaultCollisionChecker::new();
        let id = cc.add_obstacle(Obstacle::Aabb { min: (-1.0, -1.0), max: (1.0, 1.0) });
        assert!(cc.point_in_collision(&DVector::from_vec(vec![0.0, 0.0]), 0.0));
        cc.remove_obstacle(id);
        assert!(!cc.point_in_collision(&DVector::from_vec(vec![0.0, 0.0]), 0.0));
        assert!(cc.obstacle(id).is_none());
    }

    #[test]
    fn trajectory_in_collision_checks_every_sample() {
        let mut cc = DefaultCollisionChecker::new();
        cc.add_obstacle(Obstacle::Circle { center: (5.0, 0.0), radius: 0.5 });
        let traj = vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![5.0, 0.0]),
            DVector::from_vec(vec![10.0, 0.0]),
        ];
        assert!(cc.trajectory_in_collision(&traj, 0.0));
    }
}
