//! Default Dubins-car `EdgeKinematics` (component D's one named external
//! collaborator, given a concrete in-crate body so the workspace is
//! runnable standalone — see `SPEC_FULL.md` §10). Position layout: index 0
//! is x, index 1 is y, index 2 (if present) is heading wrapped to
//! `[-pi, pi]`, index 3 (if present) is time and is ignored here (time
//! advance is handled by the hover edge and the robot follower).
//!
//! Only the CSC path family (LSL/RSR/LSR/RSL) is implemented; the CCC
//! family (RLR/LRL) is not, so a small set of start/end heading pairs that
//! only admit a CCC solution are reported as infeasible here. That's a
//! deliberate scope cut for this default backend, not a spec requirement —
//! a consumer with a different kinematics model swaps this module out via
//! `EdgeKinematics` and is unaffected.

use nalgebra::DVector;
use std::f64::consts::PI;

use crate::edge::EdgeKinematics;

const TRAJECTORY_SAMPLES_PER_SEGMENT: usize = 8;

fn mod2pi(theta: f64) -> f64 {
    let twopi = 2.0 * PI;
    theta - twopi * (theta / twopi).floor()
}

#[derive(Debug, Clone, Copy)]
enum Seg {
    Left,
    Straight,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct DubinsPath {
    segs: [Seg; 3],
    lengths: [f64; 3], // in units of rho for turns, raw distance for the straight one is t*rho
}

fn lsl(alpha: f64, beta: f64, d: f64) -> Option<(f64, f64, f64)> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let c_ab = (alpha - beta).cos();
    let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sa - sb);
    if p_sq < 0.0 {
        return None;
    }
    let tmp = (cb - ca).atan2(d + sa - sb);
    let t = mod2pi(tmp - alpha);
    let p = p_sq.sqrt();
    let q = mod2pi(beta - tmp);
    Some((t, p, q))
}

fn rsr(alpha: f64, beta: f64, d: f64) -> Option<(f64, f64, f64)> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let c_ab = (alpha - beta).cos();
    let p_sq = 2.0 + d * d - 2.0 * c_ab - 2.0 * d * (sa - sb);
    if p_sq < 0.0 {
        return None;
    }
    let tmp = (ca - cb).atan2(d - sa + sb);
    let t = mod2pi(alpha - tmp);
    let p = p_sq.sqrt();
    let q = mod2pi(-beta + tmp);
    Some((t, p, q))
}

fn lsr(alpha: f64, beta: f64, d: f64) -> Option<(f64, f64, f64)> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let c_ab = (alpha - beta).cos();
    let p_sq = -2.0 + d * d + 2.0 * c_ab + 2.0 * d * (sa + sb);
    if p_sq < 0.0 {
        return None;
    }
    let p = p_sq.sqrt();
    let tmp = (-ca - cb).atan2(d + sa + sb) - (-2.0_f64).atan2(p);
    let t = mod2pi(tmp - alpha);
    let q = mod2pi(tmp - mod2pi(beta));
    Some((t, p, q))
}

fn rsl(alpha: f64, beta: f64, d: f64) -> Option<(f64, f64, f64)> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    let c_ab = (alpha - beta).cos();
    let p_sq = d * d - 2.0 + 2.0 * c_ab - 2.0 * d * (sa + sb);
    if p_sq < 0.0 {
        return None;
    }
    let p = p_sq.sqrt();
    let tmp = (ca + cb).atan2(d - sa - sb) - 2.0_f64.atan2(p);
    let t = mod2pi(alpha - tmp);
    let q = mod2pi(beta - tmp);
    Some((t, p, q))
}

fn shortest_path(start: (f64, f64, f64), end: (f64, f64, f64), rho: f64) -> Option<DubinsPath> {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let d = (dx * dx + dy * dy).sqrt() / rho;
    let theta = mod2pi(dy.atan2(dx));
    let alpha = mod2pi(start.2 - theta);
    let beta = mod2pi(end.2 - theta);

    let candidates: [(Seg, Seg, Seg, Option<(f64, f64, f64)>); 4] = [
        (Seg::Left, Seg::Straight, Seg::Left, lsl(alpha, beta, d)),
        (Seg::Right, Seg::Straight, Seg::Right, rsr(alpha, beta, d)),
        (Seg::Left, Seg::Straight, Seg::Right, lsr(alpha, beta, d)),
        (Seg::Right, Seg::Straight, Seg::Left, rsl(alpha, beta, d)),
    ];

    candidates
        .into_iter()
        .filter_map(|(s0, s1, s2, sol)| {
            sol.map(|(t, p, q)| DubinsPath {
                segs: [s0, s1, s2],
                lengths: [t, p, q],
            })
        })
        .min_by(|a, b| {
            let la: f64 = a.lengths.iter().sum();
            let lb: f64 = b.lengths.iter().sum();
            la.partial_cmp(&lb).unwrap()
        })
}

fn step_along(pose: (f64, f64, f64), seg: Seg, arc_or_dist: f64, rho: f64) -> (f64, f64, f64) {
    let (x, y, theta) = pose;
    match seg {
        Seg::Left => {
            let new_theta = theta + arc_or_dist;
            (
                x + rho * (new_theta.sin() - theta.sin()),
                y - rho * (new_theta.cos() - theta.cos()),
                new_theta,
            )
        }
        Seg::Right => {
            let new_theta = theta - arc_or_dist;
            (
                x - rho * (new_theta.sin() - theta.sin()),
                y + rho * (new_theta.cos() - theta.cos()),
                new_theta,
            )
        }
        Seg::Straight => (x + arc_or_dist * theta.cos(), y + arc_or_dist * theta.sin(), theta),
    }
}

fn sample_path(start: (f64, f64, f64), path: &DubinsPath, rho: f64) -> Vec<(f64, f64, f64)> {
    let mut out = vec![start];
    let mut pose = start;
    for (seg, len) in path.segs.iter().zip(path.lengths.iter()) {
        let total = *len * rho; // arc length (for turns) / distance (for straight)
        if total <= 0.0 {
            continue;
        }
        for i in 1..=TRAJECTORY_SAMPLES_PER_SEGMENT {
            let frac = i as f64 / TRAJECTORY_SAMPLES_PER_SEGMENT as f64;
            let step_param = match seg {
                Seg::Straight => total * frac,
                _ => (total / rho) * frac,
            };
            pose = step_along(pose, *seg, step_param, rho);
            out.push(pose);
        }
        // Re-anchor subsequent segments on the exact final pose of this one.
        let step_param = match seg {
            Seg::Straight => total,
            _ => total / rho,
        };
        pose = step_along(out[out.len() - TRAJECTORY_SAMPLES_PER_SEGMENT - 1], *seg, step_param, rho);
        *out.last_mut().unwrap() = pose;
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct DubinsKinematics {
    pub min_turn_radius: f64,
}

/// Straight-line `EdgeKinematics` for the plain 2-D (headingless) case
/// (`SPEC_FULL.md` §6): no turning-radius constraint, every move is the
/// direct segment between the two points. Used instead of `DubinsKinematics`
/// when `ConfigSpace::has_theta` is false, since a fixed heading of zero
/// would otherwise make every `DubinsKinematics` edge pay for an arc it
/// doesn't need.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineKinematics;

impl EdgeKinematics for StraightLineKinematics {
    fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        (a - b).norm()
    }

    fn trajectory(&self, a: &DVector<f64>, b: &DVector<f64>) -> Vec<DVector<f64>> {
        vec![a.clone(), b.clone()]
    }

    fn hover_trajectory(&self, a: &DVector<f64>) -> Vec<DVector<f64>> {
        vec![a.clone(), a.clone()]
    }

    fn valid_move(&self, _a: &DVector<f64>, _b: &DVector<f64>) -> bool {
        true
    }

    fn pose_at_dist_along(&self, trajectory: &[DVector<f64>], total_dist: f64, dist: f64) -> DVector<f64> {
        interpolate_by_fraction(trajectory, if total_dist > 0.0 { (dist / total_dist).clamp(0.0, 1.0) } else { 0.0 })
    }

    fn pose_at_time_along(&self, trajectory: &[DVector<f64>], time: f64) -> DVector<f64> {
        interpolate_by_fraction(trajectory, time.clamp(0.0, 1.0))
    }

    fn saturate(&self, point: &mut DVector<f64>, toward: &DVector<f64>, delta: f64, dist: f64) {
        if dist <= delta || dist == 0.0 {
            return;
        }
        let frac = delta / dist;
        for i in 0..point.len() {
            point[i] = toward[i] + (point[i] - toward[i]) * frac;
        }
    }
}

fn pose3(v: &DVector<f64>) -> (f64, f64, f64) {
    let theta = if v.len() > 2 { v[2] } else { 0.0 };
    (v[0], v[1], theta)
}

fn path_length(path: &DubinsPath, rho: f64) -> f64 {
    path.lengths.iter().sum::<f64>() * rho
}

impl EdgeKinematics for DubinsKinematics {
    fn distance(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        match shortest_path(pose3(a), pose3(b), self.min_turn_radius) {
            Some(p) => path_length(&p, self.min_turn_radius),
            None => f64::INFINITY,
        }
    }

    fn trajectory(&self, a: &DVector<f64>, b: &DVector<f64>) -> Vec<DVector<f64>> {
        let start = pose3(a);
        match shortest_path(start, pose3(b), self.min_turn_radius) {
            Some(path) => sample_path(start, &path, self.min_turn_radius)
                .into_iter()
                .map(|(x, y, theta)| DVector::from_vec(vec![x, y, theta]))
                .collect(),
            None => Vec::new(),
        }
    }

    fn hover_trajectory(&self, a: &DVector<f64>) -> Vec<DVector<f64>> {
        vec![a.clone(), a.clone()]
    }

    fn valid_move(&self, a: &DVector<f64>, b: &DVector<f64>) -> bool {
        shortest_path(pose3(a), pose3(b), self.min_turn_radius).is_some()
    }

    fn pose_at_dist_along(&self, trajectory: &[DVector<f64>], total_dist: f64, dist: f64) -> DVector<f64> {
        interpolate_by_fraction(trajectory, (dist / total_dist).clamp(0.0, 1.0))
    }

    fn pose_at_time_along(&self, trajectory: &[DVector<f64>], time: f64) -> DVector<f64> {
        interpolate_by_fraction(trajectory, time.clamp(0.0, 1.0))
    }

    fn saturate(&self, point: &mut DVector<f64>, toward: &DVector<f64>, delta: f64, dist: f64) {
        if dist <= delta || dist == 0.0 {
            return;
        }
        let frac = delta / dist;
        for i in 0..2 {
            point[i] = toward[i] + (point[i] - toward[i]) * frac;
        }
    }
}

fn interpolate_by_fraction(trajectory: &[DVector<f64>], frac: f64) -> DVector<f64> {
    if trajectory.is_empty() {
        return DVector::zeros(0);
    }
    if trajectory.len() == 1 {
        return trajectory[0].clone();
    }
    let n = trajectory.len() - 1;
    let pos = frac * n as f64;
    let lo = pos.floor() as usize;
    let lo = lo.min(n - 1);
    let hi = lo + 1;
    let local_frac = pos - lo as f64;
    &trajectory[lo] * (1.0 - local_frac) + &trajectory[hi] * local_frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_ahead_path_is_a_single_straight_segment() {
        let k = DubinsKinematics { min_turn_radius: 1.0 };
        let a = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![10.0, 0.0, 0.0]);
        let d = k.distance(&a, &b);
        assert!((d - 10.0).abs() < 1e-6);
    }

    #[test]
    fn u_turn_requires_extra_length_over_euclidean() {
        let k = DubinsKinematics { min_turn_radius: 1.0 };
        let a = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![0.0, 2.0, PI]);
        let d = k.distance(&a, &b);
        assert!(d.is_finite());
        assert!(d > 2.0);
    }

    #[test]
    fn trajectory_endpoints_match_requested_positions() {
        let k = DubinsKinematics { min_turn_radius: 1.0 };
        let a = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![5.0, 5.0, PI / 2.0]);
        let traj = k.trajectory(&a, &b);
        assert!(!traj.is_empty());
        let last = traj.last().unwrap();
        assert!((last[0] - 5.0).abs() < 1e-3);
        assert!((last[1] - 5.0).abs() < 1e-3);
    }

    #[test]
    fn straight_line_distance_is_plain_euclidean() {
        let k = StraightLineKinematics;
        let a = DVector::from_vec(vec![0.0, 0.0]);
        let b = DVector::from_vec(vec![3.0, 4.0]);
        assert!((k.distance(&a, &b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn straight_line_saturate_shortens_toward_the_nearest_node() {
        let k = StraightLineKinematics;
        let toward = DVector::from_vec(vec![0.0, 0.0]);
        let mut point = DVector::from_vec(vec![10.0, 0.0]);
        k.saturate(&mut point, &toward, 2.0, 10.0);
        assert!((point[0] - 2.0).abs() < 1e-9);
    }
}
