/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The graph view session: the single owner of the live graph.
//!
//! User input arrives as [`ViewIntent`]s and is applied synchronously by
//! [`GraphView::apply_intents`]. Work that must wait on data stores or the
//! host runs as tokio tasks whose results come back over a channel as
//! intents; [`GraphView::drain_pending`] collects them so the frame loop can
//! apply them like any other input. Graph mutation therefore only ever
//! happens on the owner's thread.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use euclid::default::{Point2D, Size2D, Vector2D};
use futures_util::future::BoxFuture;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ViewSettings;
use crate::datastore::{DataStore, DataStoreError, DataStoreRegistry, FetchOutcome};
use crate::graph::{
    ClassFlags, EdgeRecord, ElementRecord, Graph, Identity, MergedSet, NodeKey, NodeRecord,
};
use crate::host::{DocumentHandle, DocumentHost, HostError, MarkdownPreview, PreviewRenderer};
use crate::input::{self, KeyPress};
use crate::render::action_registry::{self, ActionContext, ContextMenu};
use crate::render::{DefaultStylesheet, GraphAction, StylesheetProvider};
use crate::view::{
    ActiveFileTracker, Camera, EventBus, HoverController, HoverTarget, LayoutEngine,
    LayoutOrchestrator, SubscriptionId, ViewEvent, ViewEventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionUpdateMode {
    Replace,
    Add,
    Toggle,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("no data stores registered")]
    NoDataStores,
    #[error("node {0:?} is not in the graph")]
    UnknownNode(NodeKey),
    #[error("node {0} is not backed by a document")]
    NotActivatable(Identity),
    #[error("no document host attached")]
    NoHost,
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Everything fetched for one expansion, ready to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionFetch {
    pub targets: Vec<Identity>,
    pub nodes: FetchOutcome<NodeRecord>,
    pub edges: FetchOutcome<EdgeRecord>,
    /// Stores queried; tells a partial failure from a total one.
    pub store_count: usize,
}

/// Result of a completed expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionReport {
    pub targets: Vec<Identity>,
    /// Target nodes now tagged `expanded`.
    pub expanded: Vec<NodeKey>,
    pub merged: MergedSet,
    pub failures: Vec<(String, DataStoreError)>,
}

/// Input to the view reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewIntent {
    SelectNode {
        key: NodeKey,
        multi_select: bool,
    },
    UpdateSelection {
        keys: Vec<NodeKey>,
        mode: SelectionUpdateMode,
    },
    ClearSelection,
    SelectAll,
    InvertSelection,
    SelectNeighbors,
    ExpandSelection,
    ExpandNodes {
        keys: Vec<NodeKey>,
    },
    RemoveSelection,
    RemoveNodes {
        keys: Vec<NodeKey>,
    },
    PinSelection,
    UnpinSelection,
    SetPinned {
        keys: Vec<NodeKey>,
        pinned: bool,
    },
    /// Open the node's document in the host, creating it if needed.
    ActivateNode {
        key: NodeKey,
    },
    BeginDrag {
        key: NodeKey,
    },
    DragTo {
        position: Point2D<f32>,
    },
    EndDrag,
    HoverEnter(HoverTarget),
    HoverLeave(HoverTarget),
    PointerEnterPopup,
    PointerLeavePopup,
    BackgroundTap,
    Pan {
        delta: Vector2D<f32>,
    },
    SetZoom {
        zoom: f32,
    },
    Resize {
        viewport: Size2D<f32>,
    },
    FitToView,
    /// A background expansion finished fetching.
    ExpansionFetched(Box<ExpansionFetch>),
}

pub struct GraphView {
    pub graph: Graph,
    settings: ViewSettings,
    stores: DataStoreRegistry,
    host: Option<Arc<dyn DocumentHost>>,
    renderer: Arc<dyn PreviewRenderer>,
    stylesheet: Box<dyn StylesheetProvider>,
    layout: LayoutOrchestrator,
    hover: HoverController,
    active_file: ActiveFileTracker,
    events: EventBus,
    focused: bool,
    intent_tx: mpsc::UnboundedSender<ViewIntent>,
    intent_rx: mpsc::UnboundedReceiver<ViewIntent>,
    /// Shared with background tasks; cancelled when the view is dropped.
    cancel: CancellationToken,
}

impl std::fmt::Debug for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("graph", &self.graph)
            .field("stores", &self.stores)
            .field("layout", &self.layout)
            .field("hover", &self.hover)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl GraphView {
    pub fn new(settings: ViewSettings) -> Self {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let renderer: Arc<dyn PreviewRenderer> = Arc::new(MarkdownPreview);
        let mut graph = Graph::new();
        graph.camera = Camera::from_settings(&settings.camera);
        Self {
            graph,
            stores: DataStoreRegistry::new(),
            host: None,
            hover: HoverController::new(&settings, None, Arc::clone(&renderer)),
            renderer,
            stylesheet: Box::new(DefaultStylesheet::default()),
            layout: LayoutOrchestrator::with_force_layout(settings.layout.clone()),
            active_file: ActiveFileTracker::new(settings.camera_animation()),
            events: EventBus::new(),
            focused: false,
            intent_tx,
            intent_rx,
            cancel: CancellationToken::new(),
            settings,
        }
    }

    pub fn with_host(mut self, host: Arc<dyn DocumentHost>) -> Self {
        self.host = Some(host);
        self.rebuild_hover();
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PreviewRenderer>) -> Self {
        self.renderer = renderer;
        self.rebuild_hover();
        self
    }

    pub fn with_stylesheet(mut self, stylesheet: Box<dyn StylesheetProvider>) -> Self {
        self.stylesheet = stylesheet;
        self
    }

    pub fn with_layout_engine(mut self, engine: Box<dyn LayoutEngine>) -> Self {
        self.layout = LayoutOrchestrator::new(engine, self.settings.layout.clone());
        self
    }

    fn rebuild_hover(&mut self) {
        self.hover = HoverController::new(
            &self.settings,
            self.host.clone(),
            Arc::clone(&self.renderer),
        );
    }

    pub fn register_store(&mut self, store: Arc<dyn DataStore>) {
        info!("Registered data store '{}'", store.store_id());
        self.stores.register(store);
    }

    pub fn unregister_store(&mut self, store_id: &str) -> bool {
        self.stores.unregister(store_id)
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn stores(&self) -> &DataStoreRegistry {
        &self.stores
    }

    pub fn layout(&self) -> &LayoutOrchestrator {
        &self.layout
    }

    /// Run the active layout to completion; returns the steps taken.
    pub fn settle_layout(&mut self) -> u32 {
        self.layout.run_to_completion(&mut self.graph)
    }

    pub fn hover(&self) -> &HoverController {
        &self.hover
    }

    pub fn active_file(&self) -> &ActiveFileTracker {
        &self.active_file
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Keyboard focus moved to or away from the view. Losing focus closes
    /// any preview.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.hover.dismiss(&mut self.graph);
        }
    }

    pub fn subscribe(&mut self, kind: ViewEventKind) -> (SubscriptionId, crossbeam_channel::Receiver<ViewEvent>) {
        self.events.subscribe(kind)
    }

    pub fn subscribe_name(
        &mut self,
        name: &str,
    ) -> Option<(SubscriptionId, crossbeam_channel::Receiver<ViewEvent>)> {
        self.events.subscribe_name(name)
    }

    pub fn subscribe_all(&mut self) -> (SubscriptionId, crossbeam_channel::Receiver<ViewEvent>) {
        self.events.subscribe_all()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Announce the view: emit the stylesheet, then `VizReady`.
    pub fn initialize(&mut self) {
        self.refresh_stylesheet();
        self.events.emit(ViewEvent::VizReady {
            revision: self.graph.revision(),
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
        });
    }

    pub fn refresh_stylesheet(&mut self) -> String {
        let sheet = self.stylesheet.stylesheet(&self.settings);
        self.events.emit(ViewEvent::Stylesheet(sheet.clone()));
        sheet
    }

    /// Drain all pending intents from background tasks (non-blocking).
    pub fn drain_pending(&mut self) -> Vec<ViewIntent> {
        let mut intents = Vec::new();
        while let Ok(intent) = self.intent_rx.try_recv() {
            intents.push(intent);
        }
        intents
    }

    /// One frame: apply finished background work, then advance the layout
    /// run, the camera animation and the popup anchor.
    pub fn tick(&mut self, dt: Duration) {
        let pending = self.drain_pending();
        self.apply_intents(pending);
        self.hover.drain_pending(&self.graph);
        self.layout.tick(&mut self.graph);
        self.graph.camera.tick(dt);
        self.hover.reposition(&self.graph);
    }

    /// Key presses for this frame; ignored unless the view has focus.
    pub fn handle_keys(&mut self, presses: &[KeyPress]) {
        let actions = input::collect_actions(presses, self.focused);
        self.apply_intents(input::intents_from_actions(&actions));
    }

    pub fn handle_graph_actions(&mut self, actions: Vec<GraphAction>) {
        self.apply_intents(crate::render::intents_from_graph_actions(actions));
    }

    pub fn apply_intents<I>(&mut self, intents: I)
    where
        I: IntoIterator<Item = ViewIntent>,
    {
        for intent in intents {
            self.apply_intent(intent);
        }
    }

    fn apply_intent(&mut self, intent: ViewIntent) {
        match intent {
            ViewIntent::SelectNode { key, multi_select } => self.select_node(key, multi_select),
            ViewIntent::UpdateSelection { keys, mode } => self.update_selection(&keys, mode),
            ViewIntent::ClearSelection => self.clear_selection(),
            ViewIntent::SelectAll => self.select_all(),
            ViewIntent::InvertSelection => self.invert_selection(),
            ViewIntent::SelectNeighbors => self.select_neighbors(),
            ViewIntent::ExpandSelection => {
                let keys = self.graph.selected_nodes();
                self.spawn_expand(&keys);
            },
            ViewIntent::ExpandNodes { keys } => self.spawn_expand(&keys),
            ViewIntent::RemoveSelection => {
                let keys = self.graph.selected_nodes();
                self.remove_nodes(&keys);
            },
            ViewIntent::RemoveNodes { keys } => {
                self.remove_nodes(&keys);
            },
            ViewIntent::PinSelection => {
                let keys = self.graph.selected_nodes();
                self.set_pinned(&keys, true);
            },
            ViewIntent::UnpinSelection => {
                let keys = self.graph.selected_nodes();
                self.set_pinned(&keys, false);
            },
            ViewIntent::SetPinned { keys, pinned } => self.set_pinned(&keys, pinned),
            ViewIntent::ActivateNode { key } => self.spawn_activate(key),
            ViewIntent::BeginDrag { key } => self.begin_drag(key),
            ViewIntent::DragTo { position } => self.layout.drag_to(&mut self.graph, position),
            ViewIntent::EndDrag => self.end_drag(),
            ViewIntent::HoverEnter(target) => self.hover.enter(&mut self.graph, target),
            ViewIntent::HoverLeave(target) => self.hover.leave(&mut self.graph, target),
            ViewIntent::PointerEnterPopup => self.hover.pointer_enter_popup(),
            ViewIntent::PointerLeavePopup => self.hover.pointer_leave_popup(),
            ViewIntent::BackgroundTap => {
                self.background_tap();
            },
            ViewIntent::Pan { delta } => {
                self.graph.camera.pan(delta);
                self.hover.reposition(&self.graph);
            },
            ViewIntent::SetZoom { zoom } => {
                self.graph.camera.set_zoom(zoom);
                self.hover.reposition(&self.graph);
            },
            ViewIntent::Resize { viewport } => {
                self.graph.camera.set_viewport(viewport);
                self.hover.reposition(&self.graph);
            },
            ViewIntent::FitToView => self.fit_to_view(),
            ViewIntent::ExpansionFetched(fetch) => {
                self.complete_expand(*fetch);
            },
        }
    }

    fn identities(&self, keys: &[NodeKey]) -> Vec<Identity> {
        keys.iter()
            .filter_map(|key| self.graph.get_node(*key))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Start fetching the neighbourhood of `targets` and the edges that
    /// connect it to the current graph. The returned future owns everything
    /// it needs; the graph is not touched until
    /// [`GraphView::complete_expand`].
    pub fn begin_expand(
        &self,
        targets: Vec<Identity>,
    ) -> Result<BoxFuture<'static, ExpansionFetch>, ViewError> {
        if self.stores.is_empty() {
            return Err(ViewError::NoDataStores);
        }
        let stores = self.stores.clone();
        let known: Vec<Identity> = self.graph.node_ids().cloned().collect();
        Ok(Box::pin(async move {
            let nodes = stores.get_neighbourhood(&targets).await;
            let fetched: Vec<Identity> = nodes.records.iter().map(|r| r.id.clone()).collect();

            let mut seen: HashSet<Identity> = known.iter().cloned().collect();
            let mut all = known;
            for id in &fetched {
                if seen.insert(id.clone()) {
                    all.push(id.clone());
                }
            }
            let edges = stores.connect_nodes(&all, &fetched).await;
            ExpansionFetch {
                targets,
                nodes,
                edges,
                store_count: stores.len(),
            }
        }))
    }

    /// Merge a finished fetch: nodes and edges in one batch, layout restart,
    /// `expanded` on the targets, targets marked active, `Expand` emitted.
    pub fn complete_expand(&mut self, fetch: ExpansionFetch) -> ExpansionReport {
        let ExpansionFetch {
            targets,
            nodes,
            edges,
            store_count,
        } = fetch;
        let node_failures = nodes.failures.len();
        let mut failures = nodes.failures;
        failures.extend(edges.failures);

        let elements = nodes
            .records
            .into_iter()
            .map(ElementRecord::from)
            .chain(edges.records.into_iter().map(ElementRecord::from));
        let merged = self.graph.merge(elements);
        if merged.dropped_edges > 0 {
            debug!("Expansion dropped {} edges to absent nodes", merged.dropped_edges);
        }
        self.layout.restart(&mut self.graph);

        let target_keys: Vec<NodeKey> = targets
            .iter()
            .filter_map(|id| self.graph.node_key(id))
            .collect();
        let expanded = if node_failures < store_count {
            for key in &target_keys {
                self.graph.set_node_flag(*key, ClassFlags::EXPANDED, true);
            }
            target_keys.clone()
        } else {
            warn!("Every data store failed; nothing marked expanded");
            Vec::new()
        };
        self.active_file.set_active(&mut self.graph, &target_keys, false);

        info!(
            "Expanded {} nodes: {} nodes and {} edges merged ({} new nodes)",
            expanded.len(),
            merged.nodes.len(),
            merged.edges.len(),
            merged.added_nodes.len()
        );
        if !expanded.is_empty() {
            let expanded_ids = self.identities(&expanded);
            self.events.emit(ViewEvent::Expand(expanded_ids));
        }

        ExpansionReport {
            targets,
            expanded,
            merged,
            failures,
        }
    }

    /// Expand the given nodes and wait for the merge.
    pub async fn expand(&mut self, keys: &[NodeKey]) -> Result<ExpansionReport, ViewError> {
        let ids = self.identities(keys);
        self.expand_ids(ids).await
    }

    /// Expand by identity; targets need not be in the graph yet.
    pub async fn expand_ids(&mut self, ids: Vec<Identity>) -> Result<ExpansionReport, ViewError> {
        if ids.is_empty() {
            return Ok(ExpansionReport::default());
        }
        let fetch = self.begin_expand(ids)?.await;
        Ok(self.complete_expand(fetch))
    }

    fn spawn_expand(&mut self, keys: &[NodeKey]) {
        let ids = self.identities(keys);
        if ids.is_empty() {
            debug!("Nothing to expand");
            return;
        }
        let fetch = match self.begin_expand(ids) {
            Ok(fetch) => fetch,
            Err(err) => {
                warn!("Expansion not started: {err}");
                return;
            },
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; expansion skipped");
            return;
        };
        let tx = self.intent_tx.clone();
        let cancel = self.cancel.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                fetch = fetch => {
                    let _ = tx.send(ViewIntent::ExpansionFetched(Box::new(fetch)));
                }
            }
        });
    }

    /// Delete nodes and their edges from the graph (never from the stores).
    /// Surviving neighbours left without any neighbour lose `expanded`.
    pub fn remove_nodes(&mut self, keys: &[NodeKey]) -> Vec<Identity> {
        let targets: BTreeSet<NodeKey> = keys
            .iter()
            .copied()
            .filter(|key| self.graph.contains_node(*key))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }
        let neighbours: BTreeSet<NodeKey> = targets
            .iter()
            .flat_map(|key| self.graph.neighbors_of(*key))
            .filter(|key| !targets.contains(key))
            .collect();

        let removed: Vec<Identity> = self.graph.batch(|graph| {
            targets
                .iter()
                .filter_map(|key| graph.remove_node(*key))
                .map(|node| node.id)
                .collect()
        });

        for key in neighbours {
            let orphaned = self.graph.neighbors_of(key).is_empty();
            if orphaned && self.graph.get_node(key).is_some_and(|node| node.is_expanded()) {
                debug!("Node {key:?} lost its last neighbour; clearing expanded");
                self.graph.set_node_flag(key, ClassFlags::EXPANDED, false);
            }
        }

        for key in &targets {
            self.layout.forget_node(*key);
        }
        self.hover.prune(&mut self.graph);
        self.active_file.prune(&self.graph);
        self.layout.restart(&mut self.graph);
        self.events.emit(ViewEvent::Hide(removed.clone()));
        removed
    }

    pub fn set_pinned(&mut self, keys: &[NodeKey], pinned: bool) {
        let keys: Vec<NodeKey> = keys
            .iter()
            .copied()
            .filter(|key| self.graph.contains_node(*key))
            .collect();
        if keys.is_empty() {
            return;
        }
        for key in &keys {
            self.graph.set_node_flag(*key, ClassFlags::PINNED, pinned);
        }
        self.layout.restart(&mut self.graph);
        let ids = self.identities(&keys);
        self.events.emit(if pinned {
            ViewEvent::Pin(ids)
        } else {
            ViewEvent::Unpin(ids)
        });
    }

    pub fn selected_nodes(&self) -> Vec<NodeKey> {
        self.graph.selected_nodes()
    }

    pub fn select_node(&mut self, key: NodeKey, multi_select: bool) {
        let mode = if multi_select {
            SelectionUpdateMode::Toggle
        } else {
            SelectionUpdateMode::Replace
        };
        self.update_selection(&[key], mode);
    }

    pub fn update_selection(&mut self, keys: &[NodeKey], mode: SelectionUpdateMode) {
        // Ignore stale keys.
        let keys: Vec<NodeKey> = keys
            .iter()
            .copied()
            .filter(|key| self.graph.contains_node(*key))
            .collect();
        if mode == SelectionUpdateMode::Replace {
            self.graph.clear_flags(ClassFlags::SELECTED);
        }
        for key in keys {
            let selected = match mode {
                SelectionUpdateMode::Replace | SelectionUpdateMode::Add => true,
                SelectionUpdateMode::Toggle => !self
                    .graph
                    .get_node(key)
                    .is_some_and(|node| node.is_selected()),
            };
            self.graph.set_node_flag(key, ClassFlags::SELECTED, selected);
        }
        self.events.emit(ViewEvent::SelectChange);
    }

    pub fn clear_selection(&mut self) {
        self.update_selection(&[], SelectionUpdateMode::Replace);
    }

    pub fn select_all(&mut self) {
        let keys = self.graph.node_keys();
        self.update_selection(&keys, SelectionUpdateMode::Replace);
    }

    pub fn invert_selection(&mut self) {
        let keys = self.graph.node_keys();
        self.update_selection(&keys, SelectionUpdateMode::Toggle);
    }

    /// Replace the selection with the union of the selected nodes' open
    /// neighbourhoods. A selected node with a self-loop stays selected.
    pub fn select_neighbors(&mut self) {
        let neighbours: BTreeSet<NodeKey> = self
            .graph
            .selected_nodes()
            .into_iter()
            .flat_map(|key| self.graph.neighbors_of(key))
            .collect();
        let keys: Vec<NodeKey> = neighbours.into_iter().collect();
        self.update_selection(&keys, SelectionUpdateMode::Replace);
    }

    pub fn begin_drag(&mut self, key: NodeKey) {
        if self.graph.contains_node(key) {
            self.layout.begin_drag(&mut self.graph, key);
        }
    }

    pub fn end_drag(&mut self) {
        self.layout.end_drag(&mut self.graph);
    }

    /// Frame the whole graph immediately.
    pub fn fit_to_view(&mut self) {
        if let Some(bounds) = self.graph.position_bounds(self.graph.node_keys()) {
            self.graph.camera.fit(bounds);
            self.hover.reposition(&self.graph);
        }
    }

    /// Tap on empty canvas: clears the active-file highlight once after
    /// each activation. Returns whether it did.
    pub fn background_tap(&mut self) -> bool {
        self.active_file.background_tap(&mut self.graph)
    }

    /// Mark nodes as the open document's (non-animated when `animate` is
    /// false).
    pub fn set_active(&mut self, keys: &[NodeKey], animate: bool) {
        self.active_file.set_active(&mut self.graph, keys, animate);
    }

    /// The host opened `doc`: highlight its node with camera framing,
    /// expanding it into the graph first when it is absent and
    /// `auto_add_nodes` is set.
    pub async fn on_file_open(&mut self, doc: &DocumentHandle) -> Result<(), ViewError> {
        let id = Identity::from_document(doc);
        if self.graph.node_key(&id).is_none() {
            if !self.settings.auto_add_nodes {
                debug!("{} is not in the graph", doc.path);
                return Ok(());
            }
            self.expand_ids(vec![id.clone()]).await?;
        }
        if let Some(key) = self.graph.node_key(&id) {
            self.active_file.set_active(&mut self.graph, &[key], true);
        }
        Ok(())
    }

    fn activation_target(
        &self,
        key: NodeKey,
    ) -> Result<(Arc<dyn DocumentHost>, String, String), ViewError> {
        let node = self.graph.get_node(key).ok_or(ViewError::UnknownNode(key))?;
        if !node.id.is_core() {
            return Err(ViewError::NotActivatable(node.id.clone()));
        }
        let host = self.host.clone().ok_or(ViewError::NoHost)?;
        let local_id = node.id.local_id().to_string();
        let file_name = self.settings.new_document_name(&local_id);
        Ok((host, local_id, file_name))
    }

    /// Open the node's document in the host. An unresolved node is taken to
    /// be a document that does not exist yet and is created first.
    pub async fn activate_node(&self, key: NodeKey) -> Result<DocumentHandle, ViewError> {
        let (host, local_id, file_name) = self.activation_target(key)?;
        open_document(host, local_id, file_name).await
    }

    fn spawn_activate(&mut self, key: NodeKey) {
        let (host, local_id, file_name) = match self.activation_target(key) {
            Ok(target) => target,
            Err(err) => {
                warn!("Activation skipped: {err}");
                return;
            },
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; activation skipped");
            return;
        };
        runtime.spawn(async move {
            if let Err(err) = open_document(host, local_id, file_name).await {
                warn!("Activation failed: {err}");
            }
        });
    }

    /// Context menu for a right-click on `target` (or the background).
    pub fn context_menu(&self, target: Option<NodeKey>) -> ContextMenu {
        let selected = self.graph.selected_nodes();
        let pinned = selected
            .iter()
            .filter_map(|key| self.graph.get_node(*key))
            .filter(|node| node.is_pinned())
            .count();
        let context = ActionContext {
            target_node: target,
            selected: selected.len(),
            any_selected_pinned: pinned > 0,
            any_selected_unpinned: pinned < selected.len(),
            node_count: self.graph.node_count(),
        };

        let single = selected.len() <= 1;
        let host_target = target
            .filter(|_| single)
            .and_then(|key| self.graph.get_node(key))
            .filter(|node| node.id.is_core())
            .and_then(|node| self.host.as_ref()?.resolve(node.id.local_id()));

        ContextMenu {
            entries: action_registry::list_actions_for_context(&context),
            host_target,
        }
    }

    /// Right-click on a node: an unselected target becomes the selection,
    /// then the menu is resolved.
    pub fn open_context_menu(&mut self, target: Option<NodeKey>) -> ContextMenu {
        if let Some(key) = target
            && self.graph.get_node(key).is_some_and(|node| !node.is_selected())
        {
            self.select_node(key, false);
        }
        self.context_menu(target)
    }
}

impl Drop for GraphView {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn open_document(
    host: Arc<dyn DocumentHost>,
    local_id: String,
    file_name: String,
) -> Result<DocumentHandle, ViewError> {
    let doc = match host.resolve(&local_id) {
        Some(doc) => doc,
        None => {
            info!("Creating {file_name} for unresolved node {local_id}");
            host.create(&file_name).await?
        },
    };
    host.open(&doc);
    Ok(doc)
}
