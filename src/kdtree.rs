//! k-d tree over node positions, with per-dimension wrap-around distance
//! (component C). The heading dimension of a Dubins configuration wraps at
//! `[-pi, pi]`; `wrap_dims` carries the period for any dimension that does,
//! `None` for the rest. Nodes own their own tree-link fields
//! (`kd_parent`/`kd_left`/`kd_right`/`kd_split_dim`) so the tree itself only
//! needs a root pointer — no separate node storage to keep in sync with the
//! node arena.

use nalgebra::DVector;

use crate::ids::NodeId;
use crate::node::NodeArena;

pub struct KdTree {
    pub root: Option<NodeId>,
    /// `wrap_dims[i] == Some(period)` means dimension `i` wraps with that
    /// period, centered on zero (e.g. `Some(2.0 * PI)` for heading).
    pub wrap_dims: Vec<Option<f64>>,
}

impl KdTree {
    pub fn new(wrap_dims: Vec<Option<f64>>) -> Self {
        KdTree { root: None, wrap_dims }
    }

    fn wrapped_diff(&self, dim: usize, raw: f64) -> f64 {
        match self.wrap_dims.get(dim).copied().flatten() {
            None => raw,
            Some(period) => {
                let mut d = raw % period;
                if d > period / 2.0 {
                    d -= period;
                } else if d < -period / 2.0 {
                    d += period;
                }
                d
            }
        }
    }

    fn sq_dist(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .enumerate()
            .map(|(i, (x, y))| {
                let d = self.wrapped_diff(i, x - y);
                d * d
            })
            .sum()
    }

    pub fn insert(&mut self, arena: &mut NodeArena, id: NodeId) {
        match self.root {
            None => {
                arena[id].kd_split_dim = 0;
                self.root = Some(id);
            }
            Some(root) => self.insert_under(arena, root, id),
        }
    }

    fn insert_under(&mut self, arena: &mut NodeArena, mut cursor: NodeId, id: NodeId) {
        loop {
            let dims = arena[id].position.len();
            let split_dim = arena[cursor].kd_split_dim;
            let go_left = arena[id].position[split_dim] < arena[cursor].position[split_dim];
            let child = if go_left { arena[cursor].kd_left } else { arena[cursor].kd_right };
            match child {
                Some(next) => cursor = next,
                None => {
                    arena[id].kd_parent = Some(cursor);
                    arena[id].kd_split_dim = (split_dim + 1) % dims;
                    if go_left {
                        arena[cursor].kd_left = Some(id);
                    } else {
                        arena[cursor].kd_right = Some(id);
                    }
                    return;
                }
            }
        }
    }

    /// Nearest node to `query`, optionally excluding one node (typically the
    /// query node itself, already inserted).
    pub fn nearest(&self, arena: &NodeArena, query: &DVector<f64>, exclude: Option<NodeId>) -> Option<(NodeId, f64)> {
        let root = self.root?;
        let mut best: Option<(NodeId, f64)> = None;
        self.nearest_rec(arena, root, query, exclude, &mut best);
        best.map(|(id, d2)| (id, d2.sqrt()))
    }

    fn nearest_rec(
        &self,
        arena: &NodeArena,
        cursor: NodeId,
        query: &DVector<f64>,
        exclude: Option<NodeId>,
        best: &mut Option<(NodeId, f64)>,
    ) {
        let node = &arena[cursor];
        if Some(cursor) != exclude {
            let d2 = self.sq_dist(&node.position, query);
            if best.map_or(true, |(_, b)| d2 < b) {
                *best = Some((cursor, d2));
            }
        }
        let split_dim = node.kd_split_dim;
        let diff = self.wrapped_diff(split_dim, query[split_dim] - node.position[split_dim]);
        let (near, far) = if diff < 0.0 {
            (node.kd_left, node.kd_right)
        } else {
            (node.kd_right, node.kd_left)
        };
        if let Some(n) = near {
            self.nearest_rec(arena, n, query, exclude, best);
        }
        if let Some(f) = far {
            if best.map_or(true, |(_, b)| diff * diff < b) {
                self.nearest_rec(arena, f, query, exclude, best);
            }
        }
    }

    /// All nodes within `radius` of `query` (`spec.md` §4.G `kd_find_within_range`).
    pub fn find_within_range(&self, arena: &NodeArena, query: &DVector<f64>, radius: f64) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.range_rec(arena, root, query, radius * radius, &mut out);
        }
        out
    }

    fn range_rec(&self, arena: &NodeArena, cursor: NodeId, query: &DVector<f64>, radius_sq: f64, out: &mut Vec<NodeId>) {
        let node = &arena[cursor];
        if self.sq_dist(&node.position, query) <= radius_sq {
            out.push(cursor);
        }
        let split_dim = node.kd_split_dim;
        let diff = self.wrapped_diff(split_dim, query[split_dim] - node.position[split_dim]);
        if let Some(left) = node.kd_left {
            if diff < 0.0 || diff * diff <= radius_sq {
                self.range_rec(arena, left, query, radius_sq, out);
            }
        }
        if let Some(right) = node.kd_right {
            if diff >= 0.0 || diff * diff <= radius_sq {
                self.range_rec(arena, right, query, radius_sq, out);
            }
        }
    }

    /// Extends a previous `find_within_range(query, old_radius)` result to
    /// `new_radius` in place, appending newly-covered nodes
    /// (`spec.md` §4.G `kd_find_more_within_range`, the hyper-ball-growth
    /// case in `extend`). Re-walks the whole tree at the new radius rather
    /// than resuming the old search frontier — simpler than the incremental
    /// original and still correct, at the cost of redoing the inner-radius
    /// work each time the ball grows.
    pub fn find_more_within_range(
        &self,
        arena: &mut NodeArena,
        query: &DVector<f64>,
        new_radius: f64,
        existing: &mut Vec<NodeId>,
    ) {
        for &id in existing.iter() {
            arena[id].in_range_result = true;
        }
        let fresh = self.find_within_range(arena, query, new_radius);
        for id in fresh {
            if !arena[id].in_range_result {
                arena[id].in_range_result = true;
                existing.push(id);
            }
        }
        for &id in existing.iter() {
            arena[id].in_range_result = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::f64::consts::PI;

    fn pos(v: Vec<f64>) -> DVector<f64> {
        DVector::from_vec(v)
    }

    #[test]
    fn nearest_finds_the_closest_inserted_point() {
        let mut arena = NodeArena::new();
        let mut tree = KdTree::new(vec![None, None]);
        let ids: Vec<_> = [(0.0, 0.0), (5.0, 5.0), (1.0, 1.0), (-3.0, 2.0)]
            .into_iter()
            .map(|(x, y)| {
                let id = arena.push(Node::new(pos(vec![x, y])));
                tree.insert(&mut arena, id);
                id
            })
            .collect();
        let (nearest, dist) = tree.nearest(&arena, &pos(vec![0.9, 0.9]), None).unwrap();
        assert_eq!(nearest, ids[2]);
        assert!(dist < 1.0);
    }

    #[test]
    fn find_within_range_includes_boundary_point() {
        let mut arena = NodeArena::new();
        let mut tree = KdTree::new(vec![None, None]);
        let center = arena.push(Node::new(pos(vec![0.0, 0.0])));
        tree.insert(&mut arena, center);
        let edge = arena.push(Node::new(pos(vec![3.0, 4.0])));
        tree.insert(&mut arena, edge);
        let far = arena.push(Node::new(pos(vec![100.0, 100.0])));
        tree.insert(&mut arena, far);

        let found = tree.find_within_range(&arena, &pos(vec![0.0, 0.0]), 5.0);
        assert!(found.contains(&center));
        assert!(found.contains(&edge));
        assert!(!found.contains(&far));
    }

    #[test]
    fn wrap_dimension_finds_neighbor_across_the_seam() {
        // Heading wraps at +-pi: a point at 3.0 and a point at -3.0 are close.
        let mut arena = NodeArena::new();
        let mut tree = KdTree::new(vec![None, None, Some(2.0 * PI)]);
        let a = arena.push(Node::new(pos(vec![0.0, 0.0, 3.0])));
        tree.insert(&mut arena, a);
        let b = arena.push(Node::new(pos(vec![0.0, 0.0, -3.0])));
        tree.insert(&mut arena, b);

        let (nearest, dist) = tree.nearest(&arena, &pos(vec![0.0, 0.0, -3.1]), Some(b)).unwrap();
        assert_eq!(nearest, a);
        assert!(dist < 0.3);
    }

    #[test]
    fn find_more_within_range_extends_and_keeps_previous_hits() {
        let mut arena = NodeArena::new();
        let mut tree = KdTree::new(vec![None, None]);
        let near = arena.push(Node::new(pos(vec![1.0, 0.0])));
        tree.insert(&mut arena, near);
        let far = arena.push(Node::new(pos(vec![4.0, 0.0])));
        tree.insert(&mut arena, far);

        let mut found = tree.find_within_range(&arena, &pos(vec![0.0, 0.0]), 2.0);
        assert_eq!(found, vec![near]);
        tree.find_more_within_range(&mut arena, &pos(vec![0.0, 0.0]), 5.0, &mut found);
        assert!(found.contains(&near));
        assert!(found.contains(&far));
        assert_eq!(found.len(), 2);
    }
}
