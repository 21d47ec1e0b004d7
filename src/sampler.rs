//! Sampling policies (component F, `spec.md` §4.F). All five share one
//! uniform-in-bounds primitive and layer a different goal-bias trigger (or
//! none) on top, mirroring the original's family of `rand_node_*`
//! variants. Callers pick a policy once per run; the core never cares
//! which one produced a sample.

use std::time::{Duration, Instant};

use nalgebra::DVector;
use rand::Rng;

use crate::cspace::ConfigSpace;
use crate::theta_star::ThetaStarResult;

fn sample_uniform(cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
    let mut v = DVector::zeros(cspace.num_dimensions);
    for i in 0..cspace.num_dimensions {
        v[i] = rng.gen_range(cspace.lower[i]..=cspace.upper[i]);
    }
    v
}

/// Which `rand_node_*` variant a `Sampler` draws from; picked once at
/// construction (`spec.md` §4.F: "selectable at construction").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPolicy {
    Default,
    OrGoal,
    Its,
    Time,
    OrFromStack,
}

pub struct Sampler {
    policy: SamplerPolicy,
    iterations_since_goal: u64,
    goal_every_n_iterations: u64,
    last_goal_sample: Instant,
    goal_every: Duration,
    /// Theta* bootstrap path/headings (`spec.md` §10 supplement): when set,
    /// `sample` biases a drawn point's heading toward the nearest waypoint's
    /// heading instead of drawing it uniformly, `heading_bias_prob` of the time.
    theta: Option<ThetaStarResult>,
    heading_bias_prob: f64,
}

impl Sampler {
    pub fn new(policy: SamplerPolicy, goal_every_n_iterations: u64, goal_every: Duration) -> Self {
        Sampler {
            policy,
            iterations_since_goal: 0,
            goal_every_n_iterations,
            last_goal_sample: Instant::now(),
            goal_every,
            theta: None,
            heading_bias_prob: 0.0,
        }
    }

    /// Attaches a Theta* any-angle path to bias this sampler's heading
    /// draws toward it. `bias_prob` is the chance, per sample, that a
    /// sampled heading is replaced by the nearest waypoint's heading rather
    /// than drawn uniformly.
    pub fn with_theta_bias(mut self, theta: ThetaStarResult, bias_prob: f64) -> Self {
        self.theta = Some(theta);
        self.heading_bias_prob = bias_prob;
        self
    }

    /// Draws one sample using the policy fixed at construction, then
    /// applies the Theta*-heading bias on top if one is attached.
    pub fn sample(&mut self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        let mut p = match self.policy {
            SamplerPolicy::Default => self.sample_default(cspace, rng),
            SamplerPolicy::OrGoal => self.sample_or_goal(cspace, rng),
            SamplerPolicy::Its => self.sample_its(cspace, rng),
            SamplerPolicy::Time => self.sample_time(cspace, rng),
            SamplerPolicy::OrFromStack => self.sample_or_from_stack(cspace, rng),
        };
        self.bias_heading_toward_theta(cspace, &mut p, rng);
        p
    }

    fn bias_heading_toward_theta(&self, cspace: &ConfigSpace, p: &mut DVector<f64>, rng: &mut impl Rng) {
        if !cspace.has_theta {
            return;
        }
        let Some(theta) = &self.theta else { return };
        if theta.path.is_empty() || rng.gen::<f64>() >= self.heading_bias_prob {
            return;
        }
        let mut nearest: Option<(usize, f64)> = None;
        for (i, waypoint) in theta.path.iter().enumerate() {
            let d = (waypoint[0] - p[0]).powi(2) + (waypoint[1] - p[1]).powi(2);
            if nearest.map_or(true, |(_, best)| d < best) {
                nearest = Some((i, d));
            }
        }
        if let Some((i, _)) = nearest {
            p[2] = theta.headings[i];
        }
    }

    /// `rand_point_default`: plain uniform draw, never the goal.
    pub fn sample_default(&self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        sample_uniform(cspace, rng)
    }

    /// `rand_node_or_goal`: the goal itself with probability `cspace.prob_goal`.
    pub fn sample_or_goal(&self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        if rng.gen::<f64>() < cspace.prob_goal {
            cspace.goal.clone()
        } else {
            sample_uniform(cspace, rng)
        }
    }

    /// `rand_node_its`: the goal every `goal_every_n_iterations` calls,
    /// regardless of wall-clock time.
    pub fn sample_its(&mut self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        self.iterations_since_goal += 1;
        if self.goal_every_n_iterations != 0 && self.iterations_since_goal % self.goal_every_n_iterations == 0 {
            cspace.goal.clone()
        } else {
            sample_uniform(cspace, rng)
        }
    }

    /// `rand_node_time`: the goal once per `goal_every` wall-clock interval.
    pub fn sample_time(&mut self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        if self.last_goal_sample.elapsed() >= self.goal_every {
            self.last_goal_sample = Instant::now();
            cspace.goal.clone()
        } else {
            sample_uniform(cspace, rng)
        }
    }

    /// `rand_node_or_from_stack`: drain `cspace`'s pending-sample stack
    /// (queued by obstacle-change propagation, `spec.md` §4.I) before
    /// falling back to `sample_or_goal`.
    pub fn sample_or_from_stack(&self, cspace: &ConfigSpace, rng: &mut impl Rng) -> DVector<f64> {
        cspace.pop_sample().unwrap_or_else(|| self.sample_or_goal(cspace, rng))
    }
}
