//! RRTx tree maintenance (component H, `spec.md` §4.H): `extend`,
//! `find_best_parent` (folded into `extend`), `make_parent_of`,
//! `recalculate_lmc`, `rewire`, `reduce_inconsistency`,
//! `cull_current_neighbors`. Grounded on `drrt.cpp`'s functions of the
//! same names, generalized from `shared_ptr`-linked nodes to arena
//! indices (`spec.md` §9).
//!
//! The tree is rooted at the navigation goal: `lmc`/`tree_cost` are
//! cost-to-root, the robot walks parent pointers from wherever it
//! currently is toward the root, and the sampler's goal-bias target
//! (`ConfigSpace::goal`) is the root's own position. This is the
//! RRTx/RRT# convention the original follows (`root_`/`move_goal_` in
//! `datastructures.h`), not a planner-specific choice made here.

use nalgebra::DVector;
use ordered_float::OrderedFloat;

use crate::cspace::ConfigSpace;
use crate::edge::{Edge, EdgeArena, EdgeKinematics};
use crate::heap::BinaryHeap;
use crate::ids::{EdgeId, NodeId};
use crate::kdtree::KdTree;
use crate::neighbor_iter::{current_in_entries, current_out_entries, in_neighbor_snapshot, out_neighbor_snapshot};
use crate::node::{Node, NodeArena};

pub type HeapKey = (OrderedFloat<f64>, OrderedFloat<f64>);

pub struct RrtxTree<K: EdgeKinematics> {
    pub nodes: NodeArena,
    pub edges: EdgeArena,
    pub kdtree: KdTree,
    pub heap: BinaryHeap<NodeId, HeapKey>,
    pub root: NodeId,
    pub hyper_ball_rad: f64,
    pub kinematics: K,
    pub cspace: ConfigSpace,
}

impl<K: EdgeKinematics> RrtxTree<K> {
    pub fn new(cspace: ConfigSpace, kinematics: K, wrap_dims: Vec<Option<f64>>, initial_hyper_ball_rad: f64) -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.push(Node::new_root(cspace.goal.clone()));
        let mut kdtree = KdTree::new(wrap_dims);
        kdtree.insert(&mut nodes, root);
        RrtxTree {
            nodes,
            edges: EdgeArena::new(),
            kdtree,
            heap: BinaryHeap::new(),
            root,
            hyper_ball_rad: initial_hyper_ball_rad,
            kinematics,
            cspace,
        }
    }

    pub fn current_parent_of(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id].parent_edge.map(|e| self.edges[e].end)
    }

    /// `spec.md` §4.H `extend`: insert one sampled point into the tree,
    /// choosing its best parent among nearby nodes and linking it as a
    /// two-way neighbor of each of them, then rewiring any neighbor that
    /// would shorten its own path by adopting the new node as its parent.
    /// `move_goal` is the robot's current tracking node (`spec.md` §88's
    /// `extend(..., move_goal)`): it caps how much worse than the tracked
    /// node's own cost a rewire is allowed to chase. Returns the new node's
    /// id, or `None` if the sample was rejected (in collision, or no
    /// collision-free finite-cost parent exists among the candidates). A
    /// rejected sample still consumes an arena slot and is left unlinked;
    /// arenas in this crate only grow, they're never compacted.
    pub fn extend(&mut self, sample: DVector<f64>, delta: f64, move_goal: NodeId) -> Option<NodeId> {
        let (nearest_id, nearest_dist) = self.kdtree.nearest(&self.nodes, &sample, None)?;
        let mut pos = sample;
        if nearest_dist > delta {
            let nearest_pos = self.nodes[nearest_id].position.clone();
            self.kinematics.saturate(&mut pos, &nearest_pos, delta, nearest_dist);
        }
        if self.cspace.point_in_collision(&pos) {
            return None;
        }

        let new_id = self.nodes.push(Node::new(pos.clone()));
        let mut candidates = self.kdtree.find_within_range(&self.nodes, &pos, self.hyper_ball_rad);
        if !candidates.contains(&nearest_id) {
            candidates.push(nearest_id);
        }

        let mut best: Option<(NodeId, EdgeId, f64)> = None;
        for &cand in &candidates {
            let cand_pos = self.nodes[cand].position.clone();
            let edge = Edge::new(&self.kinematics, new_id, cand, &pos, &cand_pos);
            if !edge.valid_move || self.cspace.line_check(&edge.trajectory) {
                continue;
            }
            let trial_lmc = self.nodes[cand].lmc + edge.distance;
            if trial_lmc.is_finite() && best.map_or(true, |(_, _, b)| trial_lmc < b) {
                let edge_id = self.edges.push(edge);
                best = Some((cand, edge_id, trial_lmc));
            }
        }

        let (parent, parent_edge_id, lmc) = best?;
        self.nodes[new_id].lmc = lmc;
        self.kdtree.insert(&mut self.nodes, new_id);

        for &cand in &candidates {
            let cand_pos = self.nodes[cand].position.clone();
            if cand == parent {
                self.register_directed_edge(new_id, cand, parent_edge_id);
            } else {
                self.try_link_directed(new_id, cand, &pos, &cand_pos);
            }
            let cand_to_new_edge_id = self.try_link_directed(cand, new_id, &cand_pos, &pos);

            // Rewire `cand` onto `new_id` if that's a shortcut, unless
            // `cand` is already `new_id`'s own parent (that would form a
            // 2-cycle) or the improvement chases a cost past what the
            // robot's current target already has, per `spec.md` §88.
            if let Some(edge_id) = cand_to_new_edge_id {
                let trial = self.nodes[new_id].lmc + self.edges[edge_id].distance;
                if trial < self.nodes[cand].lmc && parent != cand && trial < self.nodes[move_goal].lmc {
                    let old_lmc = self.nodes[cand].lmc;
                    self.nodes[cand].lmc = trial;
                    self.make_parent_of(cand, new_id, edge_id);
                    if old_lmc - trial > self.cspace.change_thresh && cand != self.root {
                        self.verify_in_queue(cand);
                    }
                }
            }
        }

        self.make_parent_of(new_id, parent, parent_edge_id);
        let key = self.nodes[new_id].heap_key();
        self.heap.add(new_id, key);
        Some(new_id)
    }

    /// Registers an already-built edge into `from`'s out lists and `to`'s
    /// in lists (used for the parent edge, already validated in `extend`).
    fn register_directed_edge(&mut self, from: NodeId, to: NodeId, edge_id: EdgeId) {
        self.nodes[from].initial_out.push_front(edge_id);
        let out_handle = self.nodes[from].current_out.push_front(edge_id);
        self.nodes[to].initial_in.push_front(edge_id);
        let in_handle = self.nodes[to].current_in.push_front(edge_id);
        self.edges[edge_id].handle_in_start_list = Some(out_handle);
        self.edges[edge_id].handle_in_end_list = Some(in_handle);
    }

    /// Builds and registers a fresh directed edge `from -> to` if
    /// kinematically feasible and collision-free (`spec.md` §5 step 5:
    /// neighbor linking is collision-checked the same as parent selection).
    fn try_link_directed(&mut self, from: NodeId, to: NodeId, from_pos: &DVector<f64>, to_pos: &DVector<f64>) -> Option<EdgeId> {
        let edge = Edge::new(&self.kinematics, from, to, from_pos, to_pos);
        if !edge.valid_move || self.cspace.line_check(&edge.trajectory) {
            return None;
        }
        let edge_id = self.edges.push(edge);
        self.register_directed_edge(from, to, edge_id);
        Some(edge_id)
    }

    /// `spec.md` §4.H `make_parent_of`: detach `node_id` from any previous
    /// parent's successor list, attach it to `new_parent`'s, and record the
    /// zero-distance back-edge used only for descendant tracking.
    pub fn make_parent_of(&mut self, node_id: NodeId, new_parent: NodeId, edge_id: EdgeId) {
        self.clear_parent(node_id);
        self.nodes[node_id].parent_used = true;
        self.nodes[node_id].parent_edge = Some(edge_id);
        let back_edge_id = self.edges.push(Edge::back_edge(new_parent, node_id));
        let handle = self.nodes[new_parent].successor_list.push_front(back_edge_id);
        self.nodes[node_id].successor_handle_in_parent = Some(handle);
    }

    pub(crate) fn clear_parent(&mut self, node_id: NodeId) {
        if let Some(handle) = self.nodes[node_id].successor_handle_in_parent.take() {
            if let Some(old_parent) = self.current_parent_of(node_id) {
                self.nodes[old_parent].successor_list.remove(handle);
            }
        }
        self.nodes[node_id].parent_used = false;
        self.nodes[node_id].parent_edge = None;
    }

    /// `spec.md` §4.G `cull_current_neighbors`: drop current-list entries
    /// whose edge distance has outgrown the (shrinking) hyper-ball radius.
    /// The permanent initial lists are untouched.
    pub fn cull_current_neighbors(&mut self, node_id: NodeId) {
        for (handle, edge_id) in current_out_entries(&self.nodes[node_id]) {
            if self.edges[edge_id].distance > self.hyper_ball_rad {
                self.nodes[node_id].current_out.remove(handle);
                self.edges[edge_id].handle_in_start_list = None;
                if let Some(in_handle) = self.edges[edge_id].handle_in_end_list.take() {
                    let to = self.edges[edge_id].end;
                    self.nodes[to].current_in.remove(in_handle);
                }
            }
        }
        for (handle, edge_id) in current_in_entries(&self.nodes[node_id]) {
            if self.edges[edge_id].distance > self.hyper_ball_rad {
                self.nodes[node_id].current_in.remove(handle);
                self.edges[edge_id].handle_in_end_list = None;
                if let Some(out_handle) = self.edges[edge_id].handle_in_start_list.take() {
                    let from = self.edges[edge_id].start;
                    self.nodes[from].current_out.remove(out_handle);
                }
            }
        }
    }

    /// `spec.md` §4.H `recalculate_lmc`: recompute `node_id`'s lmc from
    /// scratch over its (culled) current out-neighbors, reparenting if the
    /// best candidate differs from the current parent. Neighbors currently
    /// in the orphan set are skipped — they're mid-disconnection and don't
    /// offer a trustworthy cost.
    pub fn recalculate_lmc(&mut self, node_id: NodeId) {
        self.cull_current_neighbors(node_id);
        let neighbors = out_neighbor_snapshot(&self.nodes[node_id]);
        let mut best: Option<(NodeId, EdgeId, f64)> = None;
        for edge_id in neighbors {
            let edge = &self.edges[edge_id];
            let neighbor = edge.end;
            if neighbor == node_id || self.nodes[neighbor].in_orphan_set || !edge.valid_move {
                continue;
            }
            if self.cspace.line_check(&edge.trajectory) {
                continue;
            }
            let trial = self.nodes[neighbor].lmc + edge.distance;
            if trial.is_finite() && best.map_or(true, |(_, _, b)| trial < b) {
                best = Some((neighbor, edge_id, trial));
            }
        }
        match best {
            Some((new_parent, edge_id, lmc)) => {
                self.nodes[node_id].lmc = lmc;
                if self.current_parent_of(node_id) != Some(new_parent) {
                    self.make_parent_of(node_id, new_parent, edge_id);
                }
            }
            None => {
                self.nodes[node_id].lmc = f64::INFINITY;
                self.clear_parent(node_id);
            }
        }
    }

    /// `spec.md` §4.H `rewire`: only runs once this node's own cost drop
    /// exceeds `change_thresh`; offers itself as a better parent to each
    /// in-neighbor that isn't already its own parent.
    pub fn rewire(&mut self, node_id: NodeId) {
        if self.nodes[node_id].tree_cost - self.nodes[node_id].lmc <= self.cspace.change_thresh {
            return;
        }
        self.cull_current_neighbors(node_id);
        let own_parent = self.current_parent_of(node_id);
        for edge_id in in_neighbor_snapshot(&self.nodes[node_id]) {
            let edge = &self.edges[edge_id];
            let neighbor = edge.start;
            if Some(neighbor) == own_parent || neighbor == node_id || self.nodes[neighbor].in_orphan_set || !edge.valid_move {
                continue;
            }
            if self.cspace.line_check(&edge.trajectory) {
                continue;
            }
            let trial = self.nodes[node_id].lmc + edge.distance;
            if trial < self.nodes[neighbor].lmc {
                self.nodes[neighbor].lmc = trial;
                self.make_parent_of(neighbor, node_id, edge_id);
                if self.nodes[neighbor].tree_cost - self.nodes[neighbor].lmc > self.cspace.change_thresh {
                    self.verify_in_queue(neighbor);
                }
            }
        }
    }

    /// `spec.md` §4.H `verify_in_queue`: (re)insert with a fresh key.
    pub fn verify_in_queue(&mut self, node_id: NodeId) {
        let key = self.nodes[node_id].heap_key();
        self.heap.add(node_id, key);
    }

    /// `spec.md` §4.H `reduce_inconsistency`: drain the priority queue
    /// until `target` (the robot's current tracking node) is both
    /// consistent and no longer queued, and isn't dominated by the queue's
    /// new top.
    pub fn reduce_inconsistency(&mut self, target: NodeId) {
        loop {
            let Some((_, top_key)) = self.heap.top() else { break };
            let target_key = self.nodes[target].heap_key();
            let target_needs_work = !self.nodes[target].is_consistent() || self.heap.marked(target);
            if top_key >= target_key && !target_needs_work {
                break;
            }
            let (node_id, _) = self.heap.pop().unwrap();
            if self.nodes[node_id].tree_cost - self.nodes[node_id].lmc > self.cspace.change_thresh {
                self.recalculate_lmc(node_id);
                self.rewire(node_id);
            }
            self.nodes[node_id].tree_cost = self.nodes[node_id].lmc;
        }
    }

    /// Seeds a chain of hover nodes above the root along the time axis
    /// (`spec.md` §10, supplemented from `drrt.cpp`'s `addOtherTimesToRoot`):
    /// lets a time-aware search treat "wait at the goal" as always free.
    pub fn add_other_times_to_root(&mut self, count: usize, dt: f64) {
        if !self.cspace.has_time {
            return;
        }
        let mut parent = self.root;
        let time_dim = self.nodes[self.root].position.len() - 1;
        for i in 1..=count {
            let mut pos = self.nodes[self.root].position.clone();
            pos[time_dim] += dt * i as f64;
            let id = self.nodes.push(Node::new_root(pos.clone()));
            self.kdtree.insert(&mut self.nodes, id);
            let hover = self.kinematics.hover_trajectory(&self.nodes[parent].position);
            let edge_id = self.edges.push(Edge {
                start: id,
                end: parent,
                distance: 0.0,
                trajectory: hover,
                valid_move: true,
                handle_in_start_list: None,
                handle_in_end_list: None,
            });
            self.register_directed_edge(id, parent, edge_id);
            self.make_parent_of(id, parent, edge_id);
            parent = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dubins::DubinsKinematics;
    use std::f64::consts::PI;

    fn cspace_2d() -> ConfigSpace {
        ConfigSpace::new(
            2,
            DVector::from_vec(vec![-10.0, -10.0]),
            DVector::from_vec(vec![10.0, 10.0]),
            false,
            false,
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![0.0, 0.0]),
            0.1,
            0.1,
            1.0,
            1.0,
            2.0,
            1e-6,
            None,
        )
    }

    fn cspace_theta() -> ConfigSpace {
        ConfigSpace::new(
            3,
            DVector::from_vec(vec![-10.0, -10.0, -PI]),
            DVector::from_vec(vec![10.0, 10.0, PI]),
            true,
            false,
            DVector::from_vec(vec![0.0, 0.0, 0.0]),
            DVector::from_vec(vec![0.0, 0.0, 0.0]),
            0.1,
            0.1,
            1.0,
            1.0,
            2.0,
            1e-6,
            None,
        )
    }

    #[test]
    fn extend_links_new_node_to_its_best_parent() {
        let cspace = cspace_theta();
        let k = DubinsKinematics { min_turn_radius: 0.5 };
        let mut tree = RrtxTree::new(cspace, k, vec![None, None, Some(2.0 * PI)], 5.0);
        let root = tree.root;
        let sample = DVector::from_vec(vec![2.0, 0.0, 0.0]);
        let id = tree.extend(sample, 3.0, root).expect("sample should extend");
        assert!(tree.nodes[id].parent_used);
        assert!(tree.nodes[id].lmc.is_finite());
    }

    #[test]
    fn extend_rejects_samples_inside_an_obstacle() {
        let cspace = cspace_theta();
        let obstacle_center = (1.0, 0.0);
        cspace.add_obstacle(crate::collision::Obstacle::Circle { center: obstacle_center, radius: 2.0 });
        let k = DubinsKinematics { min_turn_radius: 0.5 };
        let mut tree = RrtxTree::new(cspace, k, vec![None, None, Some(2.0 * PI)], 5.0);
        let root = tree.root;
        let sample = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        assert!(tree.extend(sample, 3.0, root).is_none());
    }

    #[test]
    fn reduce_inconsistency_makes_an_extended_node_consistent() {
        let cspace = cspace_2d();
        let mut tree = RrtxTree::new(cspace, crate::dubins::StraightLineKinematics, vec![None, None], 5.0);
        let root = tree.root;
        let id = tree.extend(DVector::from_vec(vec![2.0, 0.0]), 5.0, root).unwrap();
        tree.reduce_inconsistency(id);
        assert!(tree.nodes[id].is_consistent());
        assert!((tree.nodes[id].tree_cost - 2.0).abs() < 1e-9);
    }
}
