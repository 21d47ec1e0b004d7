//! CLI entry point (`spec.md` §6). Parses arguments and a scenario file,
//! drives `PlannerBasic`'s main loop one slice at a time, and maps the
//! outcome to the exit codes §6 specifies: 0 on reaching the goal, 1 on
//! infeasibility after the configured time budget, 2 on bad input.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};

use rrtx_planner::config::{build_cspace, wrap_dims, Cli, ScenarioFile};
use rrtx_planner::dubins::DubinsKinematics;
use rrtx_planner::instrumentation::Timer;
use rrtx_planner::planner::{Planner, PlannerBasic};
use rrtx_planner::viz::{VizKind, VizLog};

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let scenario = match ScenarioFile::load(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let cspace = match build_cspace(&cli, &scenario) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let kinematics = DubinsKinematics {
        min_turn_radius: cli.min_turn_radius.max(1e-6),
    };
    let mut viz = cli.viz_out.as_ref().and_then(|path| match VizLog::create(path) {
        Ok(v) => Some(v),
        Err(e) => {
            error!("failed to open viz log {path:?}: {e}");
            None
        }
    });

    let mut planner = PlannerBasic::new(
        cspace,
        kinematics,
        wrap_dims(cli.dimension as usize),
        cli.delta,
        cli.ball_constant,
        cli.slice,
        cli.sampler_policy.into(),
        cli.theta_cell_size,
    );

    info!(
        "starting {:?} planner: dim={} slice={}s budget={}s",
        cli.algorithm, cli.dimension, cli.slice, cli.time_budget
    );
    let run_timer = Timer::default();
    let mut iteration: u64 = 0;

    loop {
        let stats = planner.step();
        iteration += 1;
        debug!("slice {iteration}: {:.3}ms total, tree size {}", stats.total_ms(), planner.tree_size());

        if let Some(log) = viz.as_mut() {
            if let Some(edge_id) = planner.robot.next_move_target.and_then(|t| planner.tree.nodes[t].parent_edge) {
                let edge = &planner.tree.edges[edge_id];
                if let (Some(start), Some(end)) = (edge.trajectory.first(), edge.trajectory.last()) {
                    let kind = if edge.valid_move { VizKind::Trajectory } else { VizKind::Collision };
                    let _ = log.log_edge(start, end, kind);
                }
            }
        }

        if planner.reached_goal() {
            info!("goal reached after {iteration} slices ({:.2}s simulated)", run_timer.dur_s());
            return ExitCode::from(0);
        }
        if run_timer.dur_s() >= cli.time_budget {
            error!("time budget of {}s exhausted without reaching the goal", cli.time_budget);
            return ExitCode::from(1);
        }
    }
}
