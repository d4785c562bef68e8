/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Incremental merge of fetched elements into the live graph.
//!
//! This is the only path by which store data enters the graph. Existing
//! elements are updated in place so their keys, positions and user state
//! survive; new elements are added. Everything happens inside one batch, so
//! nodes and the edges fetched with them appear in a single revision.

use std::collections::HashSet;

use log::debug;
use serde_json::Value;

use super::{EdgeKey, ElementData, Graph, NodeKey};
use crate::graph::classes::Classes;
use crate::graph::identity::Identity;

/// A node as returned by a data store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: Identity,
    pub data: ElementData,
    pub classes: Classes,
}

impl NodeRecord {
    pub fn new(id: Identity) -> Self {
        Self {
            id,
            data: ElementData::new(),
            classes: Classes::new(),
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_data("name", Value::String(name.into()))
    }

    pub fn with_data(mut self, field: &str, value: Value) -> Self {
        self.data.insert(field.to_string(), value);
        self
    }

    pub fn with_classes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.classes.add_name(name.as_ref());
        }
        self
    }
}

/// An edge as returned by a data store.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: Option<Identity>,
    pub source: Identity,
    pub target: Identity,
    pub data: ElementData,
    pub classes: Classes,
}

impl EdgeRecord {
    pub fn new(source: Identity, target: Identity) -> Self {
        Self {
            id: None,
            source,
            target,
            data: ElementData::new(),
            classes: Classes::new(),
        }
    }

    pub fn with_id(mut self, id: Identity) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        self.with_data("context", Value::String(context.into()))
    }

    pub fn with_data(mut self, field: &str, value: Value) -> Self {
        self.data.insert(field.to_string(), value);
        self
    }

    pub fn with_classes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.classes.add_name(name.as_ref());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementRecord {
    Node(NodeRecord),
    Edge(EdgeRecord),
}

impl From<NodeRecord> for ElementRecord {
    fn from(record: NodeRecord) -> Self {
        Self::Node(record)
    }
}

impl From<EdgeRecord> for ElementRecord {
    fn from(record: EdgeRecord) -> Self {
        Self::Edge(record)
    }
}

/// Outcome of a merge: every incoming element now present in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedSet {
    /// Incoming nodes, pre-existing and new, each listed once.
    pub nodes: Vec<NodeKey>,
    /// Incoming edges, pre-existing and new, each listed once.
    pub edges: Vec<EdgeKey>,
    pub added_nodes: Vec<NodeKey>,
    pub added_edges: Vec<EdgeKey>,
    /// Edges dropped because an endpoint is not in the graph.
    pub dropped_edges: usize,
}

impl MergedSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl Graph {
    /// Merge mixed node and edge records. Nodes are merged before edges so
    /// edges may reference nodes arriving in the same call.
    pub fn merge<I>(&mut self, elements: I) -> MergedSet
    where
        I: IntoIterator<Item = ElementRecord>,
    {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for element in elements {
            match element {
                ElementRecord::Node(record) => nodes.push(record),
                ElementRecord::Edge(record) => edges.push(record),
            }
        }
        self.batch(|graph| {
            let mut merged = MergedSet::default();
            graph.merge_node_records(nodes, &mut merged);
            graph.merge_edge_records(edges, &mut merged);
            merged
        })
    }

    pub fn merge_nodes<I>(&mut self, records: I) -> MergedSet
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        self.merge(records.into_iter().map(ElementRecord::Node))
    }

    pub fn merge_edges<I>(&mut self, records: I) -> MergedSet
    where
        I: IntoIterator<Item = EdgeRecord>,
    {
        self.merge(records.into_iter().map(ElementRecord::Edge))
    }

    fn merge_node_records(&mut self, records: Vec<NodeRecord>, merged: &mut MergedSet) {
        let mut seen = HashSet::new();
        for record in records {
            let key = match self.node_key(&record.id) {
                Some(key) => {
                    if let Some(node) = self.get_node_mut(key) {
                        node.classes.merge_incoming(&record.classes);
                        node.data = record.data;
                    }
                    key
                },
                None => {
                    let key = self.insert_node(record);
                    merged.added_nodes.push(key);
                    key
                },
            };
            if seen.insert(key) {
                merged.nodes.push(key);
            }
        }
    }

    fn merge_edge_records(&mut self, records: Vec<EdgeRecord>, merged: &mut MergedSet) {
        let mut seen = HashSet::new();
        for record in records {
            let existing = record.id.as_ref().and_then(|id| self.edge_key(id));
            let key = match existing {
                Some(key) => {
                    if let Some(edge) = self.get_edge_mut(key) {
                        edge.classes.merge_incoming(&record.classes);
                        edge.data = record.data;
                    }
                    key
                },
                None => {
                    let label = format!("{} -> {}", record.source, record.target);
                    match self.insert_edge(record) {
                        Some(key) => {
                            merged.added_edges.push(key);
                            key
                        },
                        None => {
                            debug!("Dropping edge {label}: endpoint not in graph");
                            merged.dropped_edges += 1;
                            continue;
                        },
                    }
                },
            };
            if seen.insert(key) {
                merged.edges.push(key);
            }
        }
    }
}
