/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tracks the node(s) standing for the host's open document.

use std::collections::HashSet;
use std::time::Duration;

use crate::graph::{ClassFlags, Graph, NodeKey};

#[derive(Debug, Clone, Default)]
pub struct ActiveFileTracker {
    active: Vec<NodeKey>,
    animation: Duration,
    /// Set by `set_active`; the next background tap clears the highlight.
    clear_on_tap: bool,
}

impl ActiveFileTracker {
    pub fn new(animation: Duration) -> Self {
        Self {
            animation,
            ..Self::default()
        }
    }

    pub fn active(&self) -> &[NodeKey] {
        &self.active
    }

    pub fn clears_on_tap(&self) -> bool {
        self.clear_on_tap
    }

    /// Mark `keys` active, their neighbourhood connected and the rest of the
    /// graph inactive. With `animate`, the camera frames the neighbourhood.
    pub fn set_active(&mut self, graph: &mut Graph, keys: &[NodeKey], animate: bool) {
        graph.clear_flags(ClassFlags::ACTIVE_STATE);
        self.active = keys
            .iter()
            .copied()
            .filter(|key| graph.contains_node(*key))
            .collect();
        if self.active.is_empty() {
            self.clear_on_tap = false;
            return;
        }

        let targets: HashSet<NodeKey> = self.active.iter().copied().collect();
        let neighbourhood = graph.closed_neighborhood(&self.active);
        for key in graph.node_keys() {
            let flag = if targets.contains(&key) {
                ClassFlags::ACTIVE_FILE
            } else if neighbourhood.contains(&key) {
                ClassFlags::CONNECTED_ACTIVE_FILE
            } else {
                ClassFlags::INACTIVE_FILE
            };
            graph.set_node_flag(key, flag, true);
        }
        for key in graph.edge_keys() {
            let touches = graph
                .edge_endpoints(key)
                .is_some_and(|(from, to)| targets.contains(&from) || targets.contains(&to));
            let flag = if touches {
                ClassFlags::CONNECTED_ACTIVE_FILE
            } else {
                ClassFlags::INACTIVE_FILE
            };
            graph.set_edge_flag(key, flag, true);
        }

        if animate && let Some(bounds) = graph.position_bounds(neighbourhood) {
            graph.camera.animate_fit(bounds, self.animation);
        }
        self.clear_on_tap = true;
    }

    pub fn clear(&mut self, graph: &mut Graph) {
        graph.clear_flags(ClassFlags::ACTIVE_STATE);
        self.active.clear();
        self.clear_on_tap = false;
    }

    /// Generic tap on the background. Clears the highlight once after each
    /// `set_active`; returns whether it did.
    pub fn background_tap(&mut self, graph: &mut Graph) -> bool {
        if !self.clear_on_tap {
            return false;
        }
        self.clear(graph);
        true
    }

    /// Drop keys of removed nodes.
    pub fn prune(&mut self, graph: &Graph) {
        self.active.retain(|key| graph.contains_node(*key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, Identity, NodeRecord};

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.merge_nodes(
            ["Home", "A", "B", "C"]
                .into_iter()
                .map(|name| NodeRecord::new(Identity::core(name))),
        );
        graph.merge_edges([
            EdgeRecord::new(Identity::core("Home"), Identity::core("A")),
            EdgeRecord::new(Identity::core("B"), Identity::core("C")),
        ]);
        graph
    }

    fn flags(graph: &Graph, name: &str) -> ClassFlags {
        graph
            .get_node_by_id(&Identity::core(name))
            .unwrap()
            .1
            .classes
            .flags()
    }

    #[test]
    fn active_neighbourhood_and_rest_are_tagged() {
        let mut graph = graph();
        let home = graph.node_key(&Identity::core("Home")).unwrap();
        let mut tracker = ActiveFileTracker::new(Duration::ZERO);
        tracker.set_active(&mut graph, &[home], false);

        assert!(flags(&graph, "Home").contains(ClassFlags::ACTIVE_FILE));
        assert!(flags(&graph, "A").contains(ClassFlags::CONNECTED_ACTIVE_FILE));
        assert!(flags(&graph, "B").contains(ClassFlags::INACTIVE_FILE));
        assert_eq!(
            graph
                .edges()
                .filter(|e| e.edge.classes.contains(ClassFlags::CONNECTED_ACTIVE_FILE))
                .count(),
            1
        );
    }

    #[test]
    fn setting_again_replaces_previous_state() {
        let mut graph = graph();
        let home = graph.node_key(&Identity::core("Home")).unwrap();
        let b = graph.node_key(&Identity::core("B")).unwrap();
        let mut tracker = ActiveFileTracker::new(Duration::ZERO);
        tracker.set_active(&mut graph, &[home], false);
        tracker.set_active(&mut graph, &[b], false);

        assert_eq!(flags(&graph, "Home"), ClassFlags::INACTIVE_FILE);
        assert_eq!(flags(&graph, "B"), ClassFlags::ACTIVE_FILE);
        assert_eq!(tracker.active(), &[b]);
    }

    #[test]
    fn background_tap_clears_once() {
        let mut graph = graph();
        let home = graph.node_key(&Identity::core("Home")).unwrap();
        let mut tracker = ActiveFileTracker::new(Duration::ZERO);
        tracker.set_active(&mut graph, &[home], false);

        assert!(tracker.background_tap(&mut graph));
        assert!(graph.nodes().all(|(_, n)| n.classes.flags().is_empty()));
        assert!(!tracker.background_tap(&mut graph));
    }

    #[test]
    fn animated_activation_frames_neighbourhood() {
        let mut graph = graph();
        for (name, x) in [("Home", 0.0), ("A", 100.0), ("B", 5000.0)] {
            let key = graph.node_key(&Identity::core(name)).unwrap();
            let node = graph.get_node_mut(key).unwrap();
            node.position = euclid::default::Point2D::new(x, 0.0);
            node.placed = true;
        }
        let home = graph.node_key(&Identity::core("Home")).unwrap();
        let mut tracker = ActiveFileTracker::new(Duration::from_millis(300));
        tracker.set_active(&mut graph, &[home], true);

        assert!(graph.camera.is_animating());
        graph.camera.tick(Duration::from_millis(300));
        assert_eq!(graph.camera.center, euclid::default::Point2D::new(50.0, 0.0));
    }
}
