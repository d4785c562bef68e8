/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pluggable data stores that feed the graph.
//!
//! A [`DataStore`] answers two questions about identities it owns: what is
//! adjacent to them, and which edges connect a node set. The
//! [`DataStoreRegistry`] asks every registered store and concatenates the
//! answers; one store failing never blocks the others.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use log::warn;

use crate::graph::{EdgeRecord, Identity, NodeRecord};

pub mod vault;

pub use vault::{CoreStore, Vault};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataStoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// A source of nodes and edges.
pub trait DataStore: Send + Sync {
    /// Store id; the prefix of every identity this store produces.
    fn store_id(&self) -> &str;

    /// Nodes adjacent to `ids`, including the nodes for `ids` themselves
    /// when this store owns them.
    fn get_neighbourhood<'a>(
        &'a self,
        ids: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, DataStoreError>>;

    /// Edges between nodes of `all` that touch at least one node of `new`.
    /// Must tolerate `new` overlapping `all`.
    fn connect_nodes<'a>(
        &'a self,
        all: &'a [Identity],
        new: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<EdgeRecord>, DataStoreError>>;
}

/// Concatenated results of one fan-out over every store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    /// Stores whose query failed, with their error.
    pub failures: Vec<(String, DataStoreError)>,
}

impl<T> Default for FetchOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> FetchOutcome<T> {
    fn collect(results: Vec<(String, Result<Vec<T>, DataStoreError>)>, what: &str) -> Self {
        let mut outcome = Self::default();
        for (store_id, result) in results {
            match result {
                Ok(records) => outcome.records.extend(records),
                Err(err) => {
                    warn!("Data store '{store_id}' failed {what}: {err}");
                    outcome.failures.push((store_id, err));
                },
            }
        }
        outcome
    }
}

/// Registered data stores, queried in registration order.
#[derive(Clone, Default)]
pub struct DataStoreRegistry {
    stores: Vec<Arc<dyn DataStore>>,
}

impl std::fmt::Debug for DataStoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|store| store.store_id()))
            .finish()
    }
}

impl DataStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store. A store whose id is already registered replaces
    /// the earlier one in place.
    pub fn register(&mut self, store: Arc<dyn DataStore>) {
        match self
            .stores
            .iter_mut()
            .find(|existing| existing.store_id() == store.store_id())
        {
            Some(existing) => *existing = store,
            None => self.stores.push(store),
        }
    }

    pub fn unregister(&mut self, store_id: &str) -> bool {
        let before = self.stores.len();
        self.stores.retain(|store| store.store_id() != store_id);
        self.stores.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn store_ids(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(|store| store.store_id())
    }

    pub async fn get_neighbourhood(&self, ids: &[Identity]) -> FetchOutcome<NodeRecord> {
        let queries: Vec<BoxFuture<'_, _>> = self
            .stores
            .iter()
            .map(|store| {
                let store_id = store.store_id().to_string();
                store
                    .get_neighbourhood(ids)
                    .map(move |result| (store_id, result))
                    .boxed()
            })
            .collect();
        FetchOutcome::collect(join_all(queries).await, "neighbourhood fetch")
    }

    pub async fn connect_nodes(
        &self,
        all: &[Identity],
        new: &[Identity],
    ) -> FetchOutcome<EdgeRecord> {
        let queries: Vec<BoxFuture<'_, _>> = self
            .stores
            .iter()
            .map(|store| {
                let store_id = store.store_id().to_string();
                store
                    .connect_nodes(all, new)
                    .map(move |result| (store_id, result))
                    .boxed()
            })
            .collect();
        FetchOutcome::collect(join_all(queries).await, "edge query")
    }
}
