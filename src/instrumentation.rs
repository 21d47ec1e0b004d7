//! Wall-clock timing used by the main loop to budget each slice
//! (`spec.md` §2 "time slicing", §5 "the outer slice-delay"). Grounded on
//! `sst.rs`'s `Timer::default()` / `dur_ms()` pattern.

use std::time::Instant;

pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Timer { start: Instant::now() }
    }
}

impl Timer {
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    pub fn dur_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn dur_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Accumulated per-phase durations for one planner slice, logged at
/// `debug!` by the main loop so a run can be profiled without a separate
/// flamegraph tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SliceStats {
    pub sample_ms: f64,
    pub extend_ms: f64,
    pub reduce_ms: f64,
    pub obstacle_ms: f64,
    pub move_ms: f64,
}

impl SliceStats {
    pub fn total_ms(&self) -> f64 {
        self.sample_ms + self.extend_ms + self.reduce_ms + self.obstacle_ms + self.move_ms
    }
}
