/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::sync::Arc;
use std::time::Duration;

use docgraph::datastore::{CoreStore, DataStore, DataStoreError, Vault};
use docgraph::graph::{ClassFlags, EdgeRecord, NodeRecord};
use docgraph::input::KeyPress;
use docgraph::view::{HoverTarget, ViewEvent, ViewEventKind};
use docgraph::{GraphView, Identity, VERSION, ViewIntent, ViewSettings};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

/// Store answering every query with whatever it currently holds.
struct ScriptedStore {
    nodes: Mutex<Vec<NodeRecord>>,
    edges: Vec<EdgeRecord>,
}

impl ScriptedStore {
    fn new(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(nodes),
            edges,
        })
    }

    fn replace_nodes(&self, nodes: Vec<NodeRecord>) {
        *self.nodes.lock() = nodes;
    }
}

impl DataStore for ScriptedStore {
    fn store_id(&self) -> &str {
        "scripted"
    }

    fn get_neighbourhood<'a>(
        &'a self,
        _ids: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, DataStoreError>> {
        async move { Ok(self.nodes.lock().clone()) }.boxed()
    }

    fn connect_nodes<'a>(
        &'a self,
        all: &'a [Identity],
        _new: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<EdgeRecord>, DataStoreError>> {
        let edges = self
            .edges
            .iter()
            .filter(|edge| all.contains(&edge.source) && all.contains(&edge.target))
            .cloned()
            .collect();
        async move { Ok(edges) }.boxed()
    }
}

struct BrokenStore;

impl DataStore for BrokenStore {
    fn store_id(&self) -> &str {
        "broken"
    }

    fn get_neighbourhood<'a>(
        &'a self,
        _ids: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, DataStoreError>> {
        async { Err(DataStoreError::Unavailable("offline".into())) }.boxed()
    }

    fn connect_nodes<'a>(
        &'a self,
        _all: &'a [Identity],
        _new: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<EdgeRecord>, DataStoreError>> {
        async { Err(DataStoreError::Unavailable("offline".into())) }.boxed()
    }
}

fn core(name: &str) -> Identity {
    Identity::core(name)
}

fn home_store() -> Arc<ScriptedStore> {
    ScriptedStore::new(
        ["Home", "A", "B"]
            .map(|name| NodeRecord::new(core(name)).with_name(name))
            .to_vec(),
        vec![
            EdgeRecord::new(core("Home"), core("A")).with_id(core("Home->A")),
            EdgeRecord::new(core("Home"), core("B")).with_id(core("Home->B")),
        ],
    )
}

fn flags(view: &GraphView, name: &str) -> ClassFlags {
    view.graph
        .get_node_by_id(&core(name))
        .map(|(_, node)| node.classes.flags())
        .unwrap_or_default()
}

fn vault() -> Arc<Vault> {
    let vault = Vault::new();
    vault.insert("Home.md", "# Home\n\nStart at [[A]], then [[B]]. #index");
    vault.insert("A.md", "Alpha links back to [[Home]].");
    vault.insert("B.md", "Beta.");
    Arc::new(vault)
}

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[tokio::test]
async fn expand_home_into_empty_graph() {
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(home_store());

    view.expand_ids(vec![core("Home")]).await.unwrap();

    assert_eq!(view.graph.node_count(), 3);
    assert_eq!(view.graph.edge_count(), 2);
    let home = flags(&view, "Home");
    assert!(home.contains(ClassFlags::EXPANDED));
    assert!(home.contains(ClassFlags::ACTIVE_FILE));
    assert!(!flags(&view, "A").contains(ClassFlags::EXPANDED));
}

#[test]
fn refetch_preserves_pinned_and_expanded() {
    let mut view = GraphView::new(ViewSettings::default());
    view.graph.merge_nodes([NodeRecord::new(core("A"))]);
    let (a, _) = view.graph.get_node_by_id(&core("A")).unwrap();
    view.graph.set_node_flag(a, ClassFlags::EXPANDED, true);
    view.set_pinned(&[a], true);

    view.graph
        .merge_nodes([NodeRecord::new(core("A")).with_classes(["visited"])]);

    let node = view.graph.get_node(a).unwrap();
    assert!(node.is_pinned());
    assert!(node.is_expanded());
    assert!(node.classes.has_name("visited"));
    assert!(node.locked);
}

#[tokio::test]
async fn hiding_the_only_neighbour_invalidates_expanded() {
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(ScriptedStore::new(
        vec![NodeRecord::new(core("B")), NodeRecord::new(core("C"))],
        vec![EdgeRecord::new(core("B"), core("C"))],
    ));
    view.expand_ids(vec![core("B")]).await.unwrap();
    assert!(flags(&view, "B").contains(ClassFlags::EXPANDED));

    let (c, _) = view.graph.get_node_by_id(&core("C")).unwrap();
    view.apply_intents([ViewIntent::RemoveNodes { keys: vec![c] }]);

    assert!(!flags(&view, "B").contains(ClassFlags::EXPANDED));
    assert_eq!(view.graph.node_count(), 1);
}

#[tokio::test]
async fn selection_laws_hold() {
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(home_store());
    view.expand_ids(vec![core("Home")]).await.unwrap();
    let (a, _) = view.graph.get_node_by_id(&core("A")).unwrap();

    view.select_node(a, false);
    let selection = view.selected_nodes();
    view.apply_intents([ViewIntent::InvertSelection, ViewIntent::InvertSelection]);
    assert_eq!(view.selected_nodes(), selection);

    view.apply_intents([ViewIntent::SelectAll, ViewIntent::InvertSelection]);
    assert!(view.selected_nodes().is_empty());
}

#[tokio::test]
async fn failing_provider_yields_partial_results() {
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(Arc::new(BrokenStore));
    view.register_store(home_store());

    let report = view.expand_ids(vec![core("Home")]).await.unwrap();

    assert_eq!(view.graph.node_count(), 3);
    assert_eq!(view.graph.edge_count(), 2);
    assert!(report.failures.iter().all(|(store, _)| store == "broken"));
    assert!(flags(&view, "Home").contains(ClassFlags::EXPANDED));
}

#[tokio::test]
async fn overlapping_expansions_apply_last_merge() {
    let store = home_store();
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(store.clone());

    let first = view.begin_expand(vec![core("Home")]).unwrap();
    let second = view.begin_expand(vec![core("Home")]).unwrap();

    let stale = vec![NodeRecord::new(core("Home")).with_name("stale")];
    let fresh = vec![NodeRecord::new(core("Home")).with_name("fresh")];
    store.replace_nodes(fresh);
    let second = second.await;
    store.replace_nodes(stale);
    let first = first.await;

    view.complete_expand(second);
    view.complete_expand(first);

    let (_, home) = view.graph.get_node_by_id(&core("Home")).unwrap();
    assert_eq!(home.name(), "stale");
    assert_eq!(view.graph.node_count(), 1);
}

#[tokio::test]
async fn vault_expansion_and_activation() {
    let vault = vault();
    let mut view = GraphView::new(ViewSettings::default()).with_host(vault.clone());
    view.register_store(Arc::new(CoreStore::new(vault.clone())));
    let (_, events) = view.subscribe_all();

    view.on_file_open(&vault.insert("Home.md", "# Home\n\nStart at [[A]], then [[C]].")).await.unwrap();

    assert_eq!(view.graph.node_count(), 3);
    let c = flags(&view, "C");
    assert!(c.contains(ClassFlags::CONNECTED_ACTIVE_FILE));
    let (c_key, c_node) = view.graph.get_node_by_id(&core("C")).unwrap();
    assert!(c_node.classes.has_name("dangling"));

    let created = view.activate_node(c_key).await.unwrap();
    assert_eq!(created.path, "C.md");
    assert_eq!(vault.opened().last(), Some(&created));

    let kinds: Vec<ViewEventKind> = events.try_iter().map(|event| event.kind()).collect();
    assert_eq!(kinds, vec![ViewEventKind::Expand]);
}

#[tokio::test(start_paused = true)]
async fn hover_preview_follows_delay_and_grace() {
    let vault = vault();
    let mut view = GraphView::new(ViewSettings::default()).with_host(vault.clone());
    view.register_store(Arc::new(CoreStore::new(vault)));
    view.expand_ids(vec![core("Home")]).await.unwrap();
    let (home, _) = view.graph.get_node_by_id(&core("Home")).unwrap();
    let frame = Duration::from_millis(16);

    view.apply_intents([ViewIntent::HoverEnter(HoverTarget::Node(home))]);
    assert!(flags(&view, "Home").contains(ClassFlags::HOVER));

    tokio::time::sleep(Duration::from_millis(450)).await;
    tokio::task::yield_now().await;
    view.tick(frame);
    assert!(view.hover().popup().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;
    view.tick(frame);
    let popup = view.hover().popup().unwrap();
    assert!(popup.html.contains("<h1>Home</h1>"));

    view.apply_intents([ViewIntent::HoverLeave(HoverTarget::Node(home))]);
    assert!(!flags(&view, "Home").contains(ClassFlags::HOVER));
    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;
    view.tick(frame);
    assert!(view.hover().popup().is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    tokio::task::yield_now().await;
    view.tick(frame);
    assert!(view.hover().popup().is_none());
}

#[tokio::test]
async fn keyboard_drives_selection_and_structure() {
    let mut view = GraphView::new(ViewSettings::default());
    view.register_store(home_store());
    view.expand_ids(vec![core("Home")]).await.unwrap();
    let (_, events) = view.subscribe(ViewEventKind::Pin);
    view.set_focused(true);

    view.handle_keys(&[KeyPress::char('a'), KeyPress::char('p')]);
    assert_eq!(view.graph.tagged_with(ClassFlags::PINNED).len(), 3);
    assert!(matches!(events.try_recv(), Ok(ViewEvent::Pin(ids)) if ids.len() == 3));

    view.handle_keys(&[KeyPress::char('u')]);
    view.handle_keys(&[KeyPress::char('i')]);
    assert!(view.graph.tagged_with(ClassFlags::PINNED).is_empty());
    assert!(view.selected_nodes().is_empty());

    view.handle_keys(&[KeyPress::char('a'), KeyPress::char('h')]);
    assert_eq!(view.graph.node_count(), 0);
}
