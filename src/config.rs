//! CLI surface and scenario-file schema (`spec.md` §6 "CLI surface").
//! `clap`'s derive API parses the command line; `serde_json` loads the
//! scenario file it points at.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use nalgebra::DVector;
use serde::Deserialize;

use crate::collision::Obstacle;
use crate::cspace::ConfigSpace;
use crate::sampler::SamplerPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Rrtx,
}

/// CLI-facing mirror of `crate::sampler::SamplerPolicy` (`clap::ValueEnum`
/// needs its own type to derive the arg parser on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SamplerPolicyArg {
    Default,
    OrGoal,
    Its,
    Time,
    OrFromStack,
}

impl From<SamplerPolicyArg> for SamplerPolicy {
    fn from(arg: SamplerPolicyArg) -> Self {
        match arg {
            SamplerPolicyArg::Default => SamplerPolicy::Default,
            SamplerPolicyArg::OrGoal => SamplerPolicy::OrGoal,
            SamplerPolicyArg::Its => SamplerPolicy::Its,
            SamplerPolicyArg::Time => SamplerPolicy::Time,
            SamplerPolicyArg::OrFromStack => SamplerPolicy::OrFromStack,
        }
    }
}

/// `spec.md` §6: "Positional: dimension (2, 3, or 4), algorithm (`rrtx`),
/// input file for start/goal/bounds/obstacles."
#[derive(Debug, Parser)]
#[command(name = "planner", about = "Dynamic RRTx motion planner")]
pub struct Cli {
    /// Configuration-space dimensionality: 2 (x, y), 3 (+ heading), or 4 (+ time).
    #[arg(value_parser = clap::value_parser!(u8).range(2..=4))]
    pub dimension: u8,

    pub algorithm: Algorithm,

    pub input: PathBuf,

    /// Saturation step: a candidate sample is shortened toward its nearest
    /// existing node so the step is at most this long.
    #[arg(long, default_value_t = 1.5)]
    pub delta: f64,

    /// `C` in `r_ball = C * (log n / n)^(1/d)`.
    #[arg(long = "ball-constant", default_value_t = 3.0)]
    pub ball_constant: f64,

    /// Wall-clock seconds per main-loop slice.
    #[arg(long, default_value_t = 0.25)]
    pub slice: f64,

    #[arg(long = "goal-prob", default_value_t = 0.1)]
    pub goal_prob: f64,

    /// Warm-up window in seconds; collision checks are suppressed while it runs.
    #[arg(long, default_value_t = 0.0)]
    pub warmup: f64,

    #[arg(long = "robot-radius", default_value_t = 0.2)]
    pub robot_radius: f64,

    #[arg(long = "robot-velocity", default_value_t = 1.0)]
    pub robot_velocity: f64,

    #[arg(long = "dubins-min-v", default_value_t = 1.0)]
    pub dubins_min_velocity: f64,

    #[arg(long = "dubins-max-v", default_value_t = 2.0)]
    pub dubins_max_velocity: f64,

    /// Minimum Dubins turning radius, independent of the velocity bounds above.
    #[arg(long = "min-turn-radius", default_value_t = 1.0)]
    pub min_turn_radius: f64,

    /// Infeasibility budget in seconds: exit code 1 if the robot hasn't
    /// reached the goal by then.
    #[arg(long = "time-budget", default_value_t = 120.0)]
    pub time_budget: f64,

    /// Optional text log of `(edge_start, edge_end, kind)` triples (`spec.md` §6).
    #[arg(long = "viz-out")]
    pub viz_out: Option<PathBuf>,

    /// Which `rand_node_*` sampling policy to draw from (`spec.md` §4.F).
    #[arg(long = "sampler-policy", value_enum, default_value_t = SamplerPolicyArg::OrFromStack)]
    pub sampler_policy: SamplerPolicyArg,

    /// Grid cell size for a one-time Theta* bootstrap whose any-angle path
    /// biases the sampler's goal-ward heading (`SPEC_FULL.md` §10). Omit to
    /// skip the bootstrap; only takes effect when the space carries a heading.
    #[arg(long = "theta-cell-size")]
    pub theta_cell_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum ObstacleSpec {
    #[serde(rename = "circle")]
    Circle { center: (f64, f64), radius: f64 },
    #[serde(rename = "aabb")]
    Aabb { min: (f64, f64), max: (f64, f64) },
}

impl From<ObstacleSpec> for Obstacle {
    fn from(spec: ObstacleSpec) -> Self {
        match spec {
            ObstacleSpec::Circle { center, radius } => Obstacle::Circle { center, radius },
            ObstacleSpec::Aabb { min, max } => Obstacle::Aabb { min, max },
        }
    }
}

/// Scenario file schema: start/goal/bounds/obstacles, loaded once at
/// startup (`spec.md` §6's "input file"). Not a persisted run-state format —
/// the planner itself never writes one back out.
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub start: Vec<f64>,
    pub goal: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("failed to parse scenario file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("scenario dimension mismatch: expected {expected} coordinates, found {found} in {field}")]
    DimensionMismatch { expected: usize, found: usize, field: &'static str },
}

impl ScenarioFile {
    pub fn load(path: &PathBuf) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.clone(), e))?;
        serde_json::from_str(&text).map_err(|e| ScenarioError::Parse(path.clone(), e))
    }

    fn check_dims(&self, num_dimensions: usize) -> Result<(), ScenarioError> {
        for (field, v) in [("start", &self.start), ("goal", &self.goal), ("lower", &self.lower), ("upper", &self.upper)] {
            if v.len() != num_dimensions {
                return Err(ScenarioError::DimensionMismatch {
                    expected: num_dimensions,
                    found: v.len(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Builds the `ConfigSpace` the main loop runs against from a parsed `Cli`
/// and its scenario file (`spec.md` §6 CLI surface → §3 `ConfigSpace`).
pub fn build_cspace(cli: &Cli, scenario: &ScenarioFile) -> Result<ConfigSpace, ScenarioError> {
    let num_dimensions = cli.dimension as usize;
    scenario.check_dims(num_dimensions)?;

    let has_theta = num_dimensions >= 3;
    let has_time = num_dimensions >= 4;
    let warmup = if cli.warmup > 0.0 { Some(Duration::from_secs_f64(cli.warmup)) } else { None };

    let cspace = ConfigSpace::new(
        num_dimensions,
        DVector::from_vec(scenario.lower.clone()),
        DVector::from_vec(scenario.upper.clone()),
        has_theta,
        has_time,
        DVector::from_vec(scenario.start.clone()),
        DVector::from_vec(scenario.goal.clone()),
        cli.goal_prob,
        cli.robot_radius,
        cli.robot_velocity,
        cli.dubins_min_velocity,
        cli.dubins_max_velocity,
        1e-6,
        warmup,
    );
    for spec in &scenario.obstacles {
        let obstacle = match spec {
            ObstacleSpec::Circle { center, radius } => Obstacle::Circle { center: *center, radius: *radius },
            ObstacleSpec::Aabb { min, max } => Obstacle::Aabb { min: *min, max: *max },
        };
        cspace.add_obstacle(obstacle);
    }
    Ok(cspace)
}

/// Wrap dimensions for the k-d tree, per `spec.md` §3: dim 2 (heading) wraps
/// at `2*pi` whenever the space carries a heading at all.
pub fn wrap_dims(num_dimensions: usize) -> Vec<Option<f64>> {
    (0..num_dimensions)
        .map(|i| if i == 2 { Some(2.0 * std::f64::consts::PI) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_dims_only_marks_the_heading_slot() {
        assert_eq!(wrap_dims(2), vec![None, None]);
        assert_eq!(wrap_dims(3), vec![None, None, Some(2.0 * std::f64::consts::PI)]);
        assert_eq!(wrap_dims(4), vec![None, None, Some(2.0 * std::f64::consts::PI), None]);
    }

    #[test]
    fn scenario_dimension_mismatch_is_reported_precisely() {
        let scenario = ScenarioFile {
            start: vec![0.0, 0.0],
            goal: vec![1.0, 1.0, 0.0],
            lower: vec![0.0, 0.0],
            upper: vec![10.0, 10.0],
            obstacles: vec![],
        };
        let err = scenario.check_dims(2).unwrap_err();
        assert!(matches!(err, ScenarioError::DimensionMismatch { field: "goal", found: 3, expected: 2 }));
    }

    #[test]
    fn scenario_json_parses_circle_and_aabb_obstacles() {
        let json = r#"{
            "start": [0.0, 0.0],
            "goal": [9.0, 9.0],
            "lower": [0.0, 0.0],
            "upper": [10.0, 10.0],
            "obstacles": [
                {"kind": "circle", "center": [5.0, 5.0], "radius": 1.0},
                {"kind": "aabb", "min": [2.0, 2.0], "max": [3.0, 3.0]}
            ]
        }"#;
        let scenario: ScenarioFile = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.obstacles.len(), 2);
    }
}
