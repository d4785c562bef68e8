/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layout orchestration around a pluggable force-directed engine.
//!
//! At most one run is active. Every structural change restarts it over the
//! whole graph with the same [`LayoutParams`], so back-to-back restarts keep
//! converging instead of oscillating. Runs are stepped by the owner's frame
//! loop ([`LayoutOrchestrator::tick`]); nobody awaits them.
//!
//! Node position locks are derived here: a node is locked while it is
//! pinned, while it is being dragged, and after a drag release until the run
//! started by that release completes.

use std::collections::HashMap;

use euclid::default::{Point2D, Vector2D};
use log::debug;

use crate::config::LayoutParams;
use crate::graph::{Graph, NodeKey};

/// Golden angle in radians; spreads seeded nodes without clustering.
const GOLDEN_ANGLE: f32 = 2.399_963;

/// Distance floor for force computation between coincident nodes.
const MIN_DISTANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStep {
    Running,
    Settled,
}

/// A force-directed layout algorithm.
pub trait LayoutEngine: Send {
    /// Begin a run over `graph`, placing nodes that have no position yet.
    fn start(&mut self, graph: &mut Graph, params: &LayoutParams);

    fn stop(&mut self);

    /// Advance one step, moving unlocked nodes.
    fn step(&mut self, graph: &mut Graph) -> LayoutStep;
}

/// Fruchterman–Reingold with gravity toward the origin and geometric cooling.
#[derive(Debug, Clone, Default)]
pub struct ForceLayout {
    params: LayoutParams,
    temperature: f32,
    running: bool,
}

impl ForceLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    fn seed_positions(graph: &mut Graph, spacing: f32) {
        let unplaced: Vec<NodeKey> = graph
            .nodes()
            .filter(|(_, node)| !node.placed)
            .map(|(key, _)| key)
            .collect();

        for (index, key) in unplaced.into_iter().enumerate() {
            let anchors: Vec<Point2D<f32>> = graph
                .neighbors_of(key)
                .into_iter()
                .filter_map(|neighbor| graph.get_node(neighbor))
                .filter(|neighbor| neighbor.placed)
                .map(|neighbor| neighbor.position)
                .collect();
            let centroid = if anchors.is_empty() {
                Point2D::origin()
            } else {
                let sum = anchors
                    .iter()
                    .fold(Vector2D::zero(), |acc, point| acc + point.to_vector());
                (sum / anchors.len() as f32).to_point()
            };
            let angle = index as f32 * GOLDEN_ANGLE;
            let radius = spacing * (0.5 + (index as f32).sqrt() * 0.5);
            if let Some(node) = graph.get_node_mut(key) {
                node.position = centroid + Vector2D::new(angle.cos(), angle.sin()) * radius;
                node.velocity = Vector2D::zero();
                node.placed = true;
            }
        }
    }
}

impl LayoutEngine for ForceLayout {
    fn start(&mut self, graph: &mut Graph, params: &LayoutParams) {
        self.params = params.clone();
        self.temperature = params.ideal_edge_length;
        self.running = true;
        Self::seed_positions(graph, params.ideal_edge_length);
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn step(&mut self, graph: &mut Graph) -> LayoutStep {
        if !self.running {
            return LayoutStep::Settled;
        }
        let k = self.params.ideal_edge_length.max(1.0);
        let keys = graph.node_keys();
        let index: HashMap<NodeKey, usize> =
            keys.iter().enumerate().map(|(i, key)| (*key, i)).collect();
        let positions: Vec<Point2D<f32>> = keys
            .iter()
            .map(|key| graph.get_node(*key).map_or(Point2D::origin(), |n| n.position))
            .collect();
        let mut displacement = vec![Vector2D::<f32>::zero(); keys.len()];

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let mut delta = positions[i] - positions[j];
                if delta.length() < MIN_DISTANCE {
                    // Coincident nodes: separate along a fixed per-pair angle.
                    let angle = (i * 31 + j) as f32 * GOLDEN_ANGLE;
                    delta = Vector2D::new(angle.cos(), angle.sin()) * MIN_DISTANCE;
                }
                let distance = delta.length().max(MIN_DISTANCE);
                let push = delta / distance * (k * k / distance);
                displacement[i] += push;
                displacement[j] -= push;
            }
        }

        for edge in graph.edges() {
            if edge.from == edge.to {
                continue;
            }
            let (Some(&s), Some(&t)) = (index.get(&edge.from), index.get(&edge.to)) else {
                continue;
            };
            let delta = positions[s] - positions[t];
            let distance = delta.length().max(MIN_DISTANCE);
            let pull = delta / distance * (distance * distance / k);
            displacement[s] -= pull;
            displacement[t] += pull;
        }

        let mut largest_move = 0.0f32;
        for (i, key) in keys.iter().enumerate() {
            let Some(node) = graph.get_node_mut(*key) else {
                continue;
            };
            if node.locked {
                node.velocity = Vector2D::zero();
                continue;
            }
            let force = displacement[i] - positions[i].to_vector() * self.params.gravity;
            let length = force.length();
            let movement = if length > 0.0 {
                force / length * length.min(self.temperature)
            } else {
                Vector2D::zero()
            };
            node.position += movement;
            node.velocity = movement;
            largest_move = largest_move.max(movement.length());
        }

        self.temperature *= self.params.cooling;
        if largest_move < self.params.convergence_threshold {
            self.running = false;
            LayoutStep::Settled
        } else {
            LayoutStep::Running
        }
    }
}

/// Owns the single active layout run.
pub struct LayoutOrchestrator {
    engine: Box<dyn LayoutEngine>,
    params: LayoutParams,
    running: bool,
    iterations: u32,
    restarts: u64,
    dragging: Option<NodeKey>,
    /// Released node held in place until the current run completes.
    release_lock: Option<NodeKey>,
}

impl std::fmt::Debug for LayoutOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOrchestrator")
            .field("params", &self.params)
            .field("running", &self.running)
            .field("iterations", &self.iterations)
            .field("restarts", &self.restarts)
            .field("dragging", &self.dragging)
            .field("release_lock", &self.release_lock)
            .finish_non_exhaustive()
    }
}

impl LayoutOrchestrator {
    pub fn new(engine: Box<dyn LayoutEngine>, params: LayoutParams) -> Self {
        Self {
            engine,
            params,
            running: false,
            iterations: 0,
            restarts: 0,
            dragging: None,
            release_lock: None,
        }
    }

    pub fn with_force_layout(params: LayoutParams) -> Self {
        Self::new(Box::new(ForceLayout::new()), params)
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of runs started so far.
    pub fn restart_count(&self) -> u64 {
        self.restarts
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn dragging(&self) -> Option<NodeKey> {
        self.dragging
    }

    /// Stop any active run and start a fresh one over the whole graph.
    pub fn restart(&mut self, graph: &mut Graph) {
        if self.running {
            self.engine.stop();
        }
        self.sync_locks(graph);
        self.engine.start(graph, &self.params);
        self.running = true;
        self.iterations = 0;
        self.restarts += 1;
        debug!(
            "Layout run {} started over {} nodes",
            self.restarts,
            graph.node_count()
        );
    }

    pub fn stop(&mut self) {
        if self.running {
            self.engine.stop();
            self.running = false;
        }
    }

    /// Step the active run once. Completes the run when the engine settles
    /// or the iteration budget is spent.
    pub fn tick(&mut self, graph: &mut Graph) -> LayoutStep {
        if !self.running {
            return LayoutStep::Settled;
        }
        let step = self.engine.step(graph);
        self.iterations += 1;
        if step == LayoutStep::Settled || self.iterations >= self.params.max_iterations {
            self.finish(graph);
            return LayoutStep::Settled;
        }
        LayoutStep::Running
    }

    /// Step until the active run completes; returns the steps taken.
    pub fn run_to_completion(&mut self, graph: &mut Graph) -> u32 {
        let mut steps = 0;
        while self.running {
            self.tick(graph);
            steps += 1;
        }
        steps
    }

    fn finish(&mut self, graph: &mut Graph) {
        self.engine.stop();
        self.running = false;
        debug!("Layout run {} settled after {} steps", self.restarts, self.iterations);
        if self.release_lock.take().is_some() {
            self.sync_locks(graph);
        }
    }

    /// The user grabbed `key`: the active run stops at once.
    pub fn begin_drag(&mut self, graph: &mut Graph, key: NodeKey) {
        self.stop();
        self.dragging = Some(key);
        if let Some(node) = graph.get_node_mut(key) {
            node.locked = true;
        }
    }

    pub fn drag_to(&mut self, graph: &mut Graph, position: Point2D<f32>) {
        let Some(key) = self.dragging else {
            return;
        };
        if let Some(node) = graph.get_node_mut(key) {
            node.position = position;
            node.placed = true;
        }
    }

    /// The user released the dragged node: restart, holding it in place
    /// until this run completes.
    pub fn end_drag(&mut self, graph: &mut Graph) {
        let Some(key) = self.dragging.take() else {
            return;
        };
        self.release_lock = graph.contains_node(key).then_some(key);
        self.restart(graph);
    }

    /// Drop any drag or release lock held on `key`, which is leaving the
    /// graph. Node keys are reused after removal.
    pub fn forget_node(&mut self, key: NodeKey) {
        if self.dragging == Some(key) {
            self.dragging = None;
        }
        if self.release_lock == Some(key) {
            self.release_lock = None;
        }
    }

    /// Recompute every node's lock from pin state and drag state.
    pub fn sync_locks(&self, graph: &mut Graph) {
        for key in graph.node_keys() {
            let held = Some(key) == self.dragging || Some(key) == self.release_lock;
            if let Some(node) = graph.get_node_mut(key) {
                node.locked = node.is_pinned() || held;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassFlags, EdgeRecord, Identity, NodeRecord};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        graph.merge_nodes(nodes.iter().map(|name| NodeRecord::new(Identity::core(*name))));
        graph.merge_edges(
            edges
                .iter()
                .map(|(s, t)| EdgeRecord::new(Identity::core(*s), Identity::core(*t))),
        );
        graph
    }

    fn key(graph: &Graph, name: &str) -> NodeKey {
        graph.node_key(&Identity::core(name)).unwrap()
    }

    fn distance(graph: &Graph, a: &str, b: &str) -> f32 {
        let a = graph.get_node(key(graph, a)).unwrap().position;
        let b = graph.get_node(key(graph, b)).unwrap().position;
        (a - b).length()
    }

    #[test]
    fn seeding_is_deterministic() {
        let mut first = graph(&["a", "b", "c"], &[("a", "b")]);
        let mut second = graph(&["a", "b", "c"], &[("a", "b")]);
        let params = LayoutParams::default();
        ForceLayout::new().start(&mut first, &params);
        ForceLayout::new().start(&mut second, &params);

        for name in ["a", "b", "c"] {
            let p = first.get_node(key(&first, name)).unwrap();
            let q = second.get_node(key(&second, name)).unwrap();
            assert!(p.placed);
            assert_eq!(p.position, q.position);
        }
        assert!(distance(&first, "a", "b") > 1.0);
    }

    #[test]
    fn new_nodes_are_seeded_near_placed_neighbors() {
        let mut g = graph(&["hub"], &[]);
        let hub = key(&g, "hub");
        {
            let node = g.get_node_mut(hub).unwrap();
            node.position = Point2D::new(1000.0, 1000.0);
            node.placed = true;
        }
        g.merge_nodes([NodeRecord::new(Identity::core("leaf"))]);
        g.merge_edges([EdgeRecord::new(Identity::core("hub"), Identity::core("leaf"))]);

        ForceLayout::new().start(&mut g, &LayoutParams::default());
        assert!(distance(&g, "hub", "leaf") < 200.0);
        assert_eq!(g.get_node(hub).unwrap().position, Point2D::new(1000.0, 1000.0));
    }

    #[test]
    fn run_settles_within_budget() {
        let mut g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.restart(&mut g);
        let steps = layout.run_to_completion(&mut g);

        assert!(steps <= LayoutParams::default().max_iterations);
        assert!(!layout.is_running());
        for (_, node) in g.nodes() {
            assert!(node.position.x.is_finite() && node.position.y.is_finite());
        }
        assert!(distance(&g, "a", "b") > 1.0);
    }

    #[test]
    fn iteration_budget_ends_run() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let params = LayoutParams {
            max_iterations: 3,
            convergence_threshold: 0.0,
            ..LayoutParams::default()
        };
        let mut layout = LayoutOrchestrator::with_force_layout(params);
        layout.restart(&mut g);
        assert_eq!(layout.tick(&mut g), LayoutStep::Running);
        assert_eq!(layout.tick(&mut g), LayoutStep::Running);
        assert_eq!(layout.tick(&mut g), LayoutStep::Settled);
        assert!(!layout.is_running());
        assert_eq!(layout.tick(&mut g), LayoutStep::Settled);
    }

    #[test]
    fn restart_replaces_active_run() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.restart(&mut g);
        layout.tick(&mut g);
        layout.restart(&mut g);
        assert!(layout.is_running());
        assert_eq!(layout.iterations(), 0);
        assert_eq!(layout.restart_count(), 2);
    }

    #[test]
    fn pinned_nodes_do_not_move() {
        let mut g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let a = key(&g, "a");
        g.set_node_flag(a, ClassFlags::PINNED, true);
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.restart(&mut g);
        let seeded = g.get_node(a).unwrap().position;
        layout.run_to_completion(&mut g);

        assert!(g.get_node(a).unwrap().locked);
        assert_eq!(g.get_node(a).unwrap().position, seeded);
    }

    #[test]
    fn drag_release_locks_until_run_completes() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let a = key(&g, "a");
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.restart(&mut g);

        layout.begin_drag(&mut g, a);
        assert!(!layout.is_running());
        layout.drag_to(&mut g, Point2D::new(500.0, 0.0));
        layout.end_drag(&mut g);

        assert!(layout.is_running());
        assert!(g.get_node(a).unwrap().locked);
        layout.tick(&mut g);
        assert_eq!(g.get_node(a).unwrap().position, Point2D::new(500.0, 0.0));

        layout.run_to_completion(&mut g);
        assert!(!g.get_node(a).unwrap().locked);
    }

    #[test]
    fn drag_release_keeps_pinned_lock() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let a = key(&g, "a");
        g.set_node_flag(a, ClassFlags::PINNED, true);
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.begin_drag(&mut g, a);
        layout.end_drag(&mut g);
        layout.run_to_completion(&mut g);
        assert!(g.get_node(a).unwrap().locked);
    }

    #[test]
    fn forgotten_node_holds_no_lock() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let a = key(&g, "a");
        let b = key(&g, "b");
        let mut layout = LayoutOrchestrator::with_force_layout(LayoutParams::default());
        layout.begin_drag(&mut g, a);
        layout.forget_node(b);
        assert_eq!(layout.dragging(), Some(a));

        layout.forget_node(a);
        assert_eq!(layout.dragging(), None);
        layout.end_drag(&mut g);
        assert!(!layout.is_running());
    }
}
