/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Live graph state for the neighbourhood view.
//!
//! Core structures:
//! - `Graph`: the single mutable store, backed by petgraph::StableGraph
//! - `Node`: a document vertex with display data, classes and layout state
//! - `Edge`: a link between two node identities
//!
//! Elements are addressed by [`Identity`] through hash indexes; petgraph keys
//! stay stable across removals. Structural mutation is expected to happen
//! inside [`Graph::batch`] so observers see one revision per logical change.

use std::collections::{BTreeSet, HashMap, HashSet};

use euclid::default::{Box2D, Point2D, Vector2D};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde_json::{Map, Value};

use crate::view::camera::Camera;

pub mod classes;
pub mod identity;
pub mod merge;

pub use classes::{ClassFlags, Classes};
pub use identity::Identity;
pub use merge::{EdgeRecord, ElementRecord, MergedSet, NodeRecord};

/// Stable node handle; a petgraph `NodeIndex` that survives other deletions.
pub type NodeKey = NodeIndex;

/// Stable edge handle (petgraph EdgeIndex)
pub type EdgeKey = EdgeIndex;

/// Free-form per-store display data.
pub type ElementData = Map<String, Value>;

/// A document vertex in the graph
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Identity,

    /// Display data, replaced wholesale on every merge.
    pub data: ElementData,

    pub classes: Classes,

    /// Position in graph space
    pub position: Point2D<f32>,

    /// Velocity for the layout simulation
    pub velocity: Vector2D<f32>,

    /// False until a layout run has seeded a position.
    pub placed: bool,

    /// Excluded from layout movement (pinned or drag-locked).
    pub locked: bool,

    /// Incident edge endpoints; a self-loop counts twice.
    pub degree: usize,

    /// Character count of the display name.
    pub name_length: usize,
}

impl Node {
    fn from_record(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            data: record.data,
            classes: record.classes.without_view_state(),
            position: Point2D::origin(),
            velocity: Vector2D::zero(),
            placed: false,
            locked: false,
            degree: 0,
            name_length: 0,
        }
    }

    /// Display name: the `name` data field, falling back to the local id.
    pub fn name(&self) -> &str {
        self.data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.id.local_id())
    }

    pub fn is_pinned(&self) -> bool {
        self.classes.contains(ClassFlags::PINNED)
    }

    pub fn is_expanded(&self) -> bool {
        self.classes.contains(ClassFlags::EXPANDED)
    }

    pub fn is_selected(&self) -> bool {
        self.classes.contains(ClassFlags::SELECTED)
    }
}

/// A link between two nodes
#[derive(Debug, Clone)]
pub struct Edge {
    /// Store-assigned identity; edges without one are never deduplicated.
    pub id: Option<Identity>,
    pub source: Identity,
    pub target: Identity,
    pub data: ElementData,
    pub classes: Classes,
}

impl Edge {
    /// Excerpt shown as the edge's hover preview.
    pub fn context(&self) -> Option<&str> {
        self.data
            .get("context")
            .and_then(Value::as_str)
            .filter(|context| !context.is_empty())
    }
}

/// Read-only view of an edge (built from petgraph edge references)
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub key: EdgeKey,
    pub from: NodeKey,
    pub to: NodeKey,
    pub edge: &'a Edge,
}

/// Main graph structure backed by petgraph::StableGraph
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) inner: StableGraph<Node, Edge, Directed>,

    id_to_node: HashMap<Identity, NodeKey>,

    id_to_edge: HashMap<Identity, EdgeKey>,

    batch_depth: u32,

    structural_dirty: bool,

    revision: u64,

    /// Pan/zoom state of the view.
    pub camera: Camera,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            inner: StableGraph::new(),
            id_to_node: HashMap::new(),
            id_to_edge: HashMap::new(),
            batch_depth: 0,
            structural_dirty: false,
            revision: 0,
            camera: Camera::default(),
        }
    }

    /// Run `f` as one atomic structural change.
    ///
    /// Derived metrics are recomputed and the revision advances once, when
    /// the outermost batch ends, and only if something structural changed.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.structural_dirty {
            self.finish_structural_change();
        }
        result
    }

    /// Monotonic counter of completed structural changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    fn mark_structural(&mut self) {
        if self.batch_depth == 0 {
            self.finish_structural_change();
        } else {
            self.structural_dirty = true;
        }
    }

    fn finish_structural_change(&mut self) {
        self.recompute_metrics();
        self.structural_dirty = false;
        self.revision = self.revision.saturating_add(1);
    }

    /// Recompute `degree` and `name_length` for every node.
    pub fn recompute_metrics(&mut self) {
        let mut degrees: HashMap<NodeKey, usize> = HashMap::new();
        for edge in self.inner.edge_references() {
            *degrees.entry(edge.source()).or_default() += 1;
            *degrees.entry(edge.target()).or_default() += 1;
        }
        let keys: Vec<NodeKey> = self.inner.node_indices().collect();
        for key in keys {
            let node = &mut self.inner[key];
            node.degree = degrees.get(&key).copied().unwrap_or(0);
            node.name_length = node.name().chars().count();
        }
    }

    pub(crate) fn insert_node(&mut self, record: NodeRecord) -> NodeKey {
        let id = record.id.clone();
        let key = self.inner.add_node(Node::from_record(record));
        self.id_to_node.insert(id, key);
        self.mark_structural();
        key
    }

    /// Add an edge between two present nodes. Returns `None` when either
    /// endpoint is missing.
    pub(crate) fn insert_edge(&mut self, record: EdgeRecord) -> Option<EdgeKey> {
        let from = self.node_key(&record.source)?;
        let to = self.node_key(&record.target)?;
        let id = record.id.clone();
        let key = self.inner.add_edge(
            from,
            to,
            Edge {
                id: record.id,
                source: record.source,
                target: record.target,
                data: record.data,
                classes: record.classes.without_view_state(),
            },
        );
        if let Some(id) = id {
            self.id_to_edge.insert(id, key);
        }
        self.mark_structural();
        Some(key)
    }

    /// Remove a node and all its connected edges
    pub(crate) fn remove_node(&mut self, key: NodeKey) -> Option<Node> {
        for edge_key in self.connected_edges(key) {
            if let Some(id) = self.inner.edge_weight(edge_key).and_then(|e| e.id.clone()) {
                self.id_to_edge.remove(&id);
            }
        }
        let node = self.inner.remove_node(key)?;
        self.id_to_node.remove(&node.id);
        self.mark_structural();
        Some(node)
    }

    pub(crate) fn remove_edge(&mut self, key: EdgeKey) -> Option<Edge> {
        let edge = self.inner.remove_edge(key)?;
        if let Some(id) = &edge.id {
            self.id_to_edge.remove(id);
        }
        self.mark_structural();
        Some(edge)
    }

    pub fn get_node(&self, key: NodeKey) -> Option<&Node> {
        self.inner.node_weight(key)
    }

    pub fn get_node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.inner.node_weight_mut(key)
    }

    pub fn get_edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.inner.edge_weight(key)
    }

    pub fn get_edge_mut(&mut self, key: EdgeKey) -> Option<&mut Edge> {
        self.inner.edge_weight_mut(key)
    }

    pub fn node_key(&self, id: &Identity) -> Option<NodeKey> {
        self.id_to_node.get(id).copied()
    }

    pub fn edge_key(&self, id: &Identity) -> Option<EdgeKey> {
        self.id_to_edge.get(id).copied()
    }

    pub fn get_node_by_id(&self, id: &Identity) -> Option<(NodeKey, &Node)> {
        let key = self.node_key(id)?;
        Some((key, self.inner.node_weight(key)?))
    }

    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.inner.contains_node(key)
    }

    pub fn edge_endpoints(&self, key: EdgeKey) -> Option<(NodeKey, NodeKey)> {
        self.inner.edge_endpoints(key)
    }

    /// Iterate over all nodes as (key, node) pairs
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.inner
            .node_indices()
            .map(move |idx| (idx, &self.inner[idx]))
    }

    pub fn node_keys(&self) -> Vec<NodeKey> {
        self.inner.node_indices().collect()
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.inner.edge_indices().collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &Identity> {
        self.inner.node_weights().map(|node| &node.id)
    }

    /// Iterate over all edges as EdgeView
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.inner.edge_references().map(|e| EdgeView {
            key: e.id(),
            from: e.source(),
            to: e.target(),
            edge: e.weight(),
        })
    }

    /// Edges touching `key` in either direction, each listed once.
    pub fn connected_edges(&self, key: NodeKey) -> Vec<EdgeKey> {
        let edges: BTreeSet<EdgeKey> = self
            .inner
            .edges_directed(key, Direction::Outgoing)
            .chain(self.inner.edges_directed(key, Direction::Incoming))
            .map(|edge| edge.id())
            .collect();
        edges.into_iter().collect()
    }

    /// Open neighbourhood of `key`, ignoring edge direction. A node with a
    /// self-loop is its own neighbour.
    pub fn neighbors_of(&self, key: NodeKey) -> Vec<NodeKey> {
        let neighbors: BTreeSet<NodeKey> = self.inner.neighbors_undirected(key).collect();
        neighbors.into_iter().collect()
    }

    /// `keys` plus every neighbour of them.
    pub fn closed_neighborhood(&self, keys: &[NodeKey]) -> HashSet<NodeKey> {
        let mut out = HashSet::new();
        for &key in keys {
            if !self.contains_node(key) {
                continue;
            }
            out.insert(key);
            out.extend(self.inner.neighbors_undirected(key));
        }
        out
    }

    /// Nodes carrying every flag in `flag`, in key order.
    pub fn tagged_with(&self, flag: ClassFlags) -> Vec<NodeKey> {
        self.nodes()
            .filter(|(_, node)| node.classes.contains(flag))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn selected_nodes(&self) -> Vec<NodeKey> {
        self.tagged_with(ClassFlags::SELECTED)
    }

    pub fn expanded_nodes(&self) -> Vec<NodeKey> {
        self.tagged_with(ClassFlags::EXPANDED)
    }

    /// Set or clear `flag` on a node. Returns whether the node exists.
    pub fn set_node_flag(&mut self, key: NodeKey, flag: ClassFlags, value: bool) -> bool {
        match self.inner.node_weight_mut(key) {
            Some(node) => {
                node.classes.set(flag, value);
                true
            },
            None => false,
        }
    }

    pub fn set_edge_flag(&mut self, key: EdgeKey, flag: ClassFlags, value: bool) -> bool {
        match self.inner.edge_weight_mut(key) {
            Some(edge) => {
                edge.classes.set(flag, value);
                true
            },
            None => false,
        }
    }

    /// Clear `flags` from every node and edge.
    pub fn clear_flags(&mut self, flags: ClassFlags) {
        for node in self.inner.node_weights_mut() {
            node.classes.remove(flags);
        }
        for edge in self.inner.edge_weights_mut() {
            edge.classes.remove(flags);
        }
    }

    /// Bounding box of the placed nodes among `keys`.
    pub fn position_bounds<I>(&self, keys: I) -> Option<Box2D<f32>>
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let mut bounds: Option<Box2D<f32>> = None;
        for key in keys {
            let Some(node) = self.get_node(key) else {
                continue;
            };
            if !node.placed {
                continue;
            }
            let point = node.position;
            bounds = Some(match bounds {
                None => Box2D::new(point, point),
                Some(b) => Box2D::new(b.min.min(point), b.max.max(point)),
            });
        }
        bounds
    }

    /// Count of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Count of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeRecord {
        NodeRecord::new(Identity::core(name))
    }

    fn edge(from: &str, to: &str) -> EdgeRecord {
        EdgeRecord::new(Identity::core(from), Identity::core(to))
            .with_id(Identity::core(format!("{from}->{to}")))
    }

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        graph.batch(|g| {
            for name in nodes {
                g.insert_node(node(name));
            }
            for (from, to) in edges {
                g.insert_edge(edge(from, to));
            }
        });
        graph
    }

    fn key(graph: &Graph, name: &str) -> NodeKey {
        graph.node_key(&Identity::core(name)).unwrap()
    }

    #[test]
    fn test_graph_new() {
        let graph = Graph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.revision(), 0);
    }

    #[test]
    fn test_lookup_by_identity() {
        let graph = graph_with(&["a:b", "c"], &[]);
        let (_, found) = graph.get_node_by_id(&Identity::core("a:b")).unwrap();
        assert_eq!(found.name(), "a:b");
        assert!(graph.get_node_by_id(&Identity::core("missing")).is_none());
    }

    #[test]
    fn test_edge_with_missing_endpoint_is_rejected() {
        let mut graph = graph_with(&["a"], &[]);
        assert!(graph.insert_edge(edge("a", "b")).is_none());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_batch_advances_revision_once() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert_eq!(graph.revision(), 1);
    }

    #[test]
    fn test_unbatched_mutations_advance_revision_each() {
        let mut graph = Graph::new();
        graph.insert_node(node("a"));
        graph.insert_node(node("b"));
        assert_eq!(graph.revision(), 2);
    }

    #[test]
    fn test_empty_batch_keeps_revision() {
        let mut graph = Graph::new();
        graph.batch(|_| {});
        assert_eq!(graph.revision(), 0);
    }

    #[test]
    fn test_metrics_recomputed_after_batch() {
        let mut graph = graph_with(&["home", "a"], &[("home", "a"), ("home", "home")]);
        let home = key(&graph, "home");
        let a = key(&graph, "a");
        assert_eq!(graph.get_node(home).unwrap().degree, 3);
        assert_eq!(graph.get_node(a).unwrap().degree, 1);
        assert_eq!(graph.get_node(home).unwrap().name_length, 4);

        graph.remove_node(a);
        assert_eq!(graph.get_node(home).unwrap().degree, 2);
    }

    #[test]
    fn test_name_prefers_data_field() {
        let mut graph = Graph::new();
        let mut record = node("x");
        record
            .data
            .insert("name".to_string(), Value::String("Readable".to_string()));
        let key = graph.insert_node(record);
        assert_eq!(graph.get_node(key).unwrap().name(), "Readable");
        assert_eq!(graph.get_node(key).unwrap().name_length, 8);
    }

    #[test]
    fn test_remove_node_drops_edges_and_indexes() {
        let mut graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("c", "a")]);
        let a = key(&graph, "a");
        graph.remove_node(a).unwrap();

        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node_key(&Identity::core("a")).is_none());
        assert!(graph.edge_key(&Identity::core("a->b")).is_none());
        assert!(graph.edge_key(&Identity::core("c->a")).is_none());
    }

    #[test]
    fn test_neighbors_ignore_direction() {
        let graph = graph_with(&["a", "b", "c", "d"], &[("a", "b"), ("c", "a"), ("a", "b")]);
        let a = key(&graph, "a");
        assert_eq!(graph.neighbors_of(a), vec![key(&graph, "b"), key(&graph, "c")]);
        assert_eq!(graph.connected_edges(a).len(), 3);
    }

    #[test]
    fn test_self_loop_is_own_neighbor() {
        let graph = graph_with(&["a"], &[("a", "a")]);
        let a = key(&graph, "a");
        assert_eq!(graph.neighbors_of(a), vec![a]);
        assert_eq!(graph.connected_edges(a).len(), 1);
    }

    #[test]
    fn test_closed_neighborhood() {
        let graph = graph_with(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c")]);
        let hood = graph.closed_neighborhood(&[key(&graph, "a")]);
        assert_eq!(hood.len(), 2);
        assert!(hood.contains(&key(&graph, "b")));
        assert!(!hood.contains(&key(&graph, "c")));
    }

    #[test]
    fn test_tagged_with_and_clear_flags() {
        let mut graph = graph_with(&["a", "b"], &[("a", "b")]);
        let a = key(&graph, "a");
        graph.set_node_flag(a, ClassFlags::SELECTED, true);
        graph.set_node_flag(a, ClassFlags::HOVER, true);
        assert_eq!(graph.selected_nodes(), vec![a]);

        graph.clear_flags(ClassFlags::HOVER_STATE);
        assert!(graph.tagged_with(ClassFlags::HOVER).is_empty());
        assert_eq!(graph.selected_nodes(), vec![a]);
    }

    #[test]
    fn test_flag_changes_are_not_structural() {
        let mut graph = graph_with(&["a"], &[]);
        let before = graph.revision();
        graph.set_node_flag(key(&graph, "a"), ClassFlags::PINNED, true);
        assert_eq!(graph.revision(), before);
    }

    #[test]
    fn test_position_bounds_skip_unplaced() {
        let mut graph = graph_with(&["a", "b", "c"], &[]);
        for (name, x, y) in [("a", -5.0, 2.0), ("b", 10.0, -3.0)] {
            let node = graph.get_node_mut(key(&graph, name)).unwrap();
            node.position = Point2D::new(x, y);
            node.placed = true;
        }
        let bounds = graph.position_bounds(graph.node_keys()).unwrap();
        assert_eq!(bounds.min, Point2D::new(-5.0, -3.0));
        assert_eq!(bounds.max, Point2D::new(10.0, 2.0));
    }
}
