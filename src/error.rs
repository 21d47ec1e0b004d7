//! Error taxonomy (`spec.md` §7). Only `InconsistentGraph` is treated as a
//! programming-error-grade fault (`debug_assert!` in debug builds, logged
//! and recovered from in release); the rest are ordinary run-time outcomes
//! a caller is expected to handle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("no collision-free sample could be drawn within the configured sampling budget")]
    InfeasibleSample,

    #[error("the robot's current move target was invalidated by an obstacle change")]
    MoveTargetInvalidated,

    #[error("no replacement move target could be found within the search radius cap")]
    NoTargetFound,

    /// Should never happen if the core's invariants hold; see `spec.md` §8
    /// and `crate::invariants`. `debug_assert!`-checked at the call sites
    /// that can detect it, logged at `error!` level otherwise.
    #[error("tree invariant violated: {0}")]
    InconsistentGraph(String),

    #[error("collision backend failed: {0}")]
    CollisionBackendFailure(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
