//! Any-angle grid search used to bootstrap an initial heuristic path
//! (component K, `spec.md` §4.K). Grounded on `original_source/src/theta_star.cpp`
//! (`ThetaStar`/`UpdateVertex`/`GetPath`), generalized the way `spec.md`
//! §9's Design Notes ask for: the original's module-scope `open_set` /
//! `closed_set` statics become locals owned by `run`, and `GetPath`'s
//! recursive walk over parent edges becomes an iterative one bounded by
//! the grid's own node count.
//!
//! This shares the crate's `KdTree`/`BinaryHeap` rather than a bespoke
//! grid-neighbor lookup, per `spec.md` §2's "shares data structures" note:
//! grid cells are stored in their own `NodeArena`/`KdTree` (distinct from
//! the RRTx tree's), and the eight-neighbor query is just a short-radius
//! `find_within_range`.

use std::collections::{HashMap, HashSet};

use nalgebra::DVector;
use ordered_float::OrderedFloat;

use crate::cspace::ConfigSpace;
use crate::heap::BinaryHeap;
use crate::ids::NodeId;
use crate::kdtree::KdTree;
use crate::node::{Node, NodeArena};

const LINE_CHECK_SAMPLES: usize = 8;

pub struct ThetaStarResult {
    /// Waypoints from the goal to the start (matching the RRTx tree's own
    /// goal-rooted convention), each a 2-D position.
    pub path: Vec<DVector<f64>>,
    /// One heading per waypoint (`spec.md` §10 "thetas", used to bias the
    /// default sampler's goal-ward heading); same length as `path`.
    pub headings: Vec<f64>,
    pub length: f64,
}

fn euclidean(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn sample_segment(a: &DVector<f64>, b: &DVector<f64>) -> Vec<DVector<f64>> {
    (0..=LINE_CHECK_SAMPLES)
        .map(|i| {
            let t = i as f64 / LINE_CHECK_SAMPLES as f64;
            DVector::from_vec(vec![a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t])
        })
        .collect()
}

/// `spec.md` §4.E `line_check`, specialized to a 2-D straight segment
/// between two grid cells: Theta* is heading-agnostic so it never needs
/// the Dubins narrow phase, only whether the straight shot is obstacle-free.
fn visible(cspace: &ConfigSpace, a: &DVector<f64>, b: &DVector<f64>) -> bool {
    !cspace.line_check(&sample_segment(a, b))
}

/// Lays a uniform grid of plain 2-D nodes over `cspace`'s bounds at
/// `cell_size` spacing and indexes them in a `KdTree` (no wrap dimensions —
/// Theta* is heading-agnostic, per `line_check`). Per-cell headings aren't
/// precomputed here; `reconstruct` derives a heading per waypoint directly
/// from the final path's segment directions instead, which the original's
/// per-grid-cell `atan2` guess was only ever an approximation of anyway.
fn build_grid(cspace: &ConfigSpace, cell_size: f64) -> (NodeArena, KdTree) {
    let mut arena = NodeArena::new();
    let mut tree = KdTree::new(vec![None, None]);

    let nx = ((cspace.upper[0] - cspace.lower[0]) / cell_size).round() as i64;
    let ny = ((cspace.upper[1] - cspace.lower[1]) / cell_size).round() as i64;

    for i in 0..=nx {
        for j in 0..=ny {
            let x = cspace.lower[0] + i as f64 * cell_size;
            let y = cspace.lower[1] + j as f64 * cell_size;
            let id = arena.push(Node::new(DVector::from_vec(vec![x, y])));
            tree.insert(&mut arena, id);
        }
    }
    (arena, tree)
}

/// Runs Theta* from the goal toward the start over a uniform grid covering
/// `cspace`'s bounds, returning `None` if the start is unreachable from the
/// goal under the grid's obstacle-aware line-of-sight checks.
pub fn run(cspace: &ConfigSpace, cell_size: f64) -> Option<ThetaStarResult> {
    let (arena, tree) = build_grid(cspace, cell_size);
    let goal = tree.nearest(&arena, &cspace.goal, None)?.0;
    let start = tree.nearest(&arena, &cspace.start, None)?.0;

    let heuristic = |id: NodeId| euclidean(&arena[id].position, &cspace.start);
    let neighbor_radius = cell_size * 2.0_f64.sqrt() * 1.01;

    let mut g: HashMap<NodeId, f64> = HashMap::new();
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut closed: HashSet<NodeId> = HashSet::new();
    let mut open: BinaryHeap<NodeId, OrderedFloat<f64>> = BinaryHeap::new();

    g.insert(goal, 0.0);
    parent.insert(goal, goal);
    open.add(goal, OrderedFloat(heuristic(goal)));

    while let Some((node, _)) = open.pop() {
        if node == start {
            return Some(reconstruct(&arena, &parent, start, goal));
        }
        closed.insert(node);

        let node_pos = arena[node].position.clone();
        for neighbor in tree.find_within_range(&arena, &node_pos, neighbor_radius) {
            if neighbor == node || closed.contains(&neighbor) {
                continue;
            }
            update_vertex(cspace, &arena, node, neighbor, &mut g, &mut parent, &mut open, &heuristic);
        }
    }
    None
}

/// `spec.md` §4.K `UpdateVertex`: prefer reparenting `neighbor` straight to
/// `node`'s parent (the "grandparent", skipping `node` entirely) whenever
/// that shortcut has line of sight; otherwise fall back to `node` itself.
#[allow(clippy::too_many_arguments)]
fn update_vertex(
    cspace: &ConfigSpace,
    arena: &NodeArena,
    node: NodeId,
    neighbor: NodeId,
    g: &mut HashMap<NodeId, f64>,
    parent: &mut HashMap<NodeId, NodeId>,
    open: &mut BinaryHeap<NodeId, OrderedFloat<f64>>,
    heuristic: &impl Fn(NodeId) -> f64,
) {
    let neighbor_pos = &arena[neighbor].position;
    let node_g = g[&node];

    let grandparent = parent.get(&node).copied().filter(|&gp| gp != node);
    let (via, via_g) = match grandparent {
        Some(gp) if visible(cspace, &arena[gp].position, neighbor_pos) => (gp, g[&gp] + euclidean(&arena[gp].position, neighbor_pos)),
        _ => (node, node_g + euclidean(&arena[node].position, neighbor_pos)),
    };

    if via_g < *g.get(&neighbor).unwrap_or(&f64::INFINITY) {
        g.insert(neighbor, via_g);
        parent.insert(neighbor, via);
        open.add(neighbor, OrderedFloat(via_g + heuristic(neighbor)));
    }
}

/// Iterative walk over parent pointers from `start` back to `goal`
/// (`spec.md` §9 "replace recursive Theta* path extraction"), returning
/// waypoints in goal-to-start order with one heading per waypoint.
fn reconstruct(arena: &NodeArena, parent: &HashMap<NodeId, NodeId>, start: NodeId, goal: NodeId) -> ThetaStarResult {
    let mut forward = vec![start];
    let mut cursor = start;
    while cursor != goal {
        cursor = parent[&cursor];
        forward.push(cursor);
    }
    forward.reverse(); // now goal -> start

    let mut length = 0.0;
    for w in forward.windows(2) {
        length += euclidean(&arena[w[0]].position, &arena[w[1]].position);
    }

    let path: Vec<DVector<f64>> = forward.iter().map(|&id| arena[id].position.clone()).collect();
    // One heading per waypoint: the outgoing direction to the next
    // waypoint, or 0.0 for the last (it has no outgoing segment).
    let mut headings: Vec<f64> = path.windows(2).map(|w| (w[1][1] - w[0][1]).atan2(w[1][0] - w[0][0])).collect();
    headings.push(0.0);

    ThetaStarResult { path, headings, length }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Obstacle;

    fn open_cspace(goal: (f64, f64), start: (f64, f64)) -> ConfigSpace {
        ConfigSpace::new(
            2,
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![20.0, 20.0]),
            false,
            false,
            DVector::from_vec(vec![start.0, start.1]),
            DVector::from_vec(vec![goal.0, goal.1]),
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
    fn open_field_path_is_a_straight_line() {
        let cspace = open_cspace((18.0, 18.0), (1.0, 1.0));
        let result = run(&cspace, 1.0).expect("path should be found");
        assert_eq!(result.path.first().unwrap()[0], 18.0);
        assert_eq!(result.path.last().unwrap()[0], 1.0);
        let direct = euclidean(&cspace.goal, &cspace.start);
        assert!(result.length <= direct * 1.05);
    }

    #[test]
    fn wall_forces_a_detour_around_its_ends() {
        let cspace = open_cspace((18.0, 18.0), (1.0, 1.0));
        // A wall along x=10 from y=0..15 separates start and goal; only the
        // gap above y=15 lets a path through (mirrors `spec.md` §8 scenario 5).
        for y in 0..=15 {
            cspace.add_obstacle(Obstacle::Aabb {
                min: (9.5, y as f64 - 0.49),
                max: (10.5, y as f64 + 0.49),
            });
        }
        let result = run(&cspace, 1.0).expect("path should route around the wall");
        let direct = euclidean(&cspace.goal, &cspace.start);
        assert!(result.length > direct);
        assert!(result.path.iter().any(|p| p[0] > 10.5 - 1e-6 || p[0] < 9.5 + 1e-6));
    }

    #[test]
    fn headings_has_one_entry_per_waypoint() {
        let cspace = open_cspace((5.0, 5.0), (0.0, 0.0));
        let result = run(&cspace, 1.0).unwrap();
        assert_eq!(result.headings.len(), result.path.len());
    }
}
