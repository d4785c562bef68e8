/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Hover highlighting and the delayed preview popup.
//!
//! Highlight classes change synchronously on pointer enter/leave. Preview
//! loading and popup closing run as cancellable tokio tasks that report back
//! over a channel; [`HoverController::drain_pending`] applies their messages
//! on the owner's thread. Every enter/leave bumps a generation counter and
//! messages from an older generation are dropped.

use std::sync::Arc;
use std::time::Duration;

use euclid::default::Point2D;
use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ViewSettings;
use crate::graph::{ClassFlags, EdgeKey, Graph, NodeKey};
use crate::host::{DocumentHandle, DocumentHost, PreviewRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoverTarget {
    Node(NodeKey),
    Edge(EdgeKey),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HoverMessage {
    PreviewReady {
        generation: u64,
        target: HoverTarget,
        html: String,
    },
    ClosePopup {
        generation: u64,
    },
}

/// An open preview popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub target: HoverTarget,
    pub html: String,
    /// Screen position of the anchor element.
    pub anchor: Point2D<f32>,
}

/// What the delayed task loads once the hover delay has passed.
enum PreviewSource {
    Document(DocumentHandle),
    Excerpt { markdown: String, source_path: String },
}

pub struct HoverController {
    hover_delay: Duration,
    popup_grace: Duration,
    hover_edges: bool,
    host: Option<Arc<dyn DocumentHost>>,
    renderer: Arc<dyn PreviewRenderer>,
    generation: u64,
    hovered: Option<HoverTarget>,
    popup: Option<Popup>,
    pointer_over_popup: bool,
    /// Cancels the pending preview task.
    pending_preview: Option<CancellationToken>,
    /// Cancels the pending grace-close task.
    pending_close: Option<CancellationToken>,
    tx: mpsc::UnboundedSender<HoverMessage>,
    rx: mpsc::UnboundedReceiver<HoverMessage>,
}

impl std::fmt::Debug for HoverController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoverController")
            .field("generation", &self.generation)
            .field("hovered", &self.hovered)
            .field("popup", &self.popup)
            .field("pointer_over_popup", &self.pointer_over_popup)
            .finish_non_exhaustive()
    }
}

impl HoverController {
    pub fn new(
        settings: &ViewSettings,
        host: Option<Arc<dyn DocumentHost>>,
        renderer: Arc<dyn PreviewRenderer>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            hover_delay: settings.hover_delay(),
            popup_grace: settings.popup_grace(),
            hover_edges: settings.hover_edges,
            host,
            renderer,
            generation: 0,
            hovered: None,
            popup: None,
            pointer_over_popup: false,
            pending_preview: None,
            pending_close: None,
            tx,
            rx,
        }
    }

    pub fn hovered(&self) -> Option<HoverTarget> {
        self.hovered
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn has_pending_preview(&self) -> bool {
        self.pending_preview.is_some()
    }

    /// Pointer entered `target`. Re-entering the hovered element replaces
    /// its pending preview.
    pub fn enter(&mut self, graph: &mut Graph, target: HoverTarget) {
        self.cancel_preview();
        self.cancel_close();
        self.generation += 1;
        if self.popup.as_ref().is_some_and(|popup| popup.target != target) {
            self.popup = None;
            self.pointer_over_popup = false;
        }
        self.hovered = Some(target);
        apply_highlight(graph, target);

        if let Some(source) = self.preview_source(graph, target) {
            self.schedule_preview(target, source);
        }
    }

    /// Pointer left `target`.
    pub fn leave(&mut self, graph: &mut Graph, target: HoverTarget) {
        if self.hovered != Some(target) {
            return;
        }
        self.cancel_preview();
        self.generation += 1;
        self.hovered = None;
        graph.clear_flags(ClassFlags::HOVER_STATE);
        if self.popup.is_some() && !self.pointer_over_popup {
            self.schedule_close();
        }
    }

    pub fn pointer_enter_popup(&mut self) {
        if self.popup.is_some() {
            self.pointer_over_popup = true;
            self.cancel_close();
        }
    }

    pub fn pointer_leave_popup(&mut self) {
        self.pointer_over_popup = false;
        if self.popup.is_some() && self.hovered.is_none() {
            self.generation += 1;
            self.schedule_close();
        }
    }

    /// Close any popup and cancel timers, e.g. when the view loses focus.
    pub fn dismiss(&mut self, graph: &mut Graph) {
        self.cancel_preview();
        self.cancel_close();
        self.generation += 1;
        self.hovered = None;
        self.popup = None;
        self.pointer_over_popup = false;
        graph.clear_flags(ClassFlags::HOVER_STATE);
    }

    /// Forget state about elements no longer in `graph`.
    pub fn prune(&mut self, graph: &mut Graph) {
        if self.hovered.is_some_and(|target| !target_exists(graph, target)) {
            self.cancel_preview();
            self.generation += 1;
            self.hovered = None;
            graph.clear_flags(ClassFlags::HOVER_STATE);
        }
        if self
            .popup
            .as_ref()
            .is_some_and(|popup| !target_exists(graph, popup.target))
        {
            self.cancel_close();
            self.popup = None;
            self.pointer_over_popup = false;
        }
    }

    /// Apply messages from finished timer tasks. Returns whether the popup
    /// opened, closed or changed.
    pub fn drain_pending(&mut self, graph: &Graph) -> bool {
        let mut changed = false;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                HoverMessage::PreviewReady {
                    generation,
                    target,
                    html,
                } => {
                    if generation != self.generation || self.hovered != Some(target) {
                        debug!("Dropping stale preview for {target:?}");
                        continue;
                    }
                    self.pending_preview = None;
                    let Some(anchor) = anchor_position(graph, target) else {
                        continue;
                    };
                    self.popup = Some(Popup {
                        target,
                        html,
                        anchor,
                    });
                    changed = true;
                },
                HoverMessage::ClosePopup { generation } => {
                    if generation != self.generation || self.pointer_over_popup {
                        debug!("Ignoring stale popup close");
                        continue;
                    }
                    self.pending_close = None;
                    if self.popup.take().is_some() {
                        changed = true;
                    }
                },
            }
        }
        changed
    }

    /// Keep the popup anchored after pan, zoom, resize or layout movement.
    pub fn reposition(&mut self, graph: &Graph) {
        if let Some(popup) = self.popup.as_mut()
            && let Some(anchor) = anchor_position(graph, popup.target)
        {
            popup.anchor = anchor;
        }
    }

    fn preview_source(&self, graph: &Graph, target: HoverTarget) -> Option<PreviewSource> {
        match target {
            HoverTarget::Node(key) => {
                let node = graph.get_node(key)?;
                if !node.id.is_core() {
                    return None;
                }
                let doc = self.host.as_ref()?.resolve(node.id.local_id())?;
                Some(PreviewSource::Document(doc))
            },
            HoverTarget::Edge(key) => {
                if !self.hover_edges {
                    return None;
                }
                let edge = graph.get_edge(key)?;
                let markdown = edge.context()?.to_string();
                let source_path = graph
                    .get_node_by_id(&edge.source)
                    .and_then(|(_, node)| node.data.get("path"))
                    .and_then(|path| path.as_str())
                    .unwrap_or_else(|| edge.source.local_id())
                    .to_string();
                Some(PreviewSource::Excerpt {
                    markdown,
                    source_path,
                })
            },
        }
    }

    fn schedule_preview(&mut self, target: HoverTarget, source: PreviewSource) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("No async runtime; hover preview disabled");
            return;
        };
        let token = CancellationToken::new();
        let cancel = token.clone();
        let delay = self.hover_delay;
        let generation = self.generation;
        let host = self.host.clone();
        let renderer = Arc::clone(&self.renderer);
        let tx = self.tx.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let html = match source {
                PreviewSource::Document(doc) => {
                    let Some(host) = host else {
                        return;
                    };
                    match host.read(&doc).await {
                        Ok(markdown) => renderer.render(&markdown, &doc.path),
                        Err(err) => {
                            warn!("Preview of {} failed: {err}", doc.path);
                            return;
                        },
                    }
                },
                PreviewSource::Excerpt {
                    markdown,
                    source_path,
                } => renderer.render(&markdown, &source_path),
            };
            if !cancel.is_cancelled() {
                let _ = tx.send(HoverMessage::PreviewReady {
                    generation,
                    target,
                    html,
                });
            }
        });
        self.pending_preview = Some(token);
    }

    fn schedule_close(&mut self) {
        self.cancel_close();
        let Ok(runtime) = Handle::try_current() else {
            self.popup = None;
            return;
        };
        let token = CancellationToken::new();
        let cancel = token.clone();
        let grace = self.popup_grace;
        let generation = self.generation;
        let tx = self.tx.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(grace) => {
                    let _ = tx.send(HoverMessage::ClosePopup { generation });
                }
            }
        });
        self.pending_close = Some(token);
    }

    fn cancel_preview(&mut self) {
        if let Some(token) = self.pending_preview.take() {
            token.cancel();
        }
    }

    fn cancel_close(&mut self) {
        if let Some(token) = self.pending_close.take() {
            token.cancel();
        }
    }
}

impl Drop for HoverController {
    fn drop(&mut self) {
        self.cancel_preview();
        self.cancel_close();
    }
}

fn target_exists(graph: &Graph, target: HoverTarget) -> bool {
    match target {
        HoverTarget::Node(key) => graph.contains_node(key),
        HoverTarget::Edge(key) => graph.get_edge(key).is_some(),
    }
}

fn anchor_position(graph: &Graph, target: HoverTarget) -> Option<Point2D<f32>> {
    let world = match target {
        HoverTarget::Node(key) => graph.get_node(key)?.position,
        HoverTarget::Edge(key) => {
            let (from, to) = graph.edge_endpoints(key)?;
            let from = graph.get_node(from)?.position;
            let to = graph.get_node(to)?.position;
            from.lerp(to, 0.5)
        },
    };
    Some(graph.camera.world_to_screen(world))
}

/// Hovered element gets `hover`, its closed neighbourhood `connected-hover`,
/// everything else `unhover`.
fn apply_highlight(graph: &mut Graph, target: HoverTarget) {
    graph.clear_flags(ClassFlags::HOVER_STATE);
    let (nodes, edges) = match target {
        HoverTarget::Node(key) => (graph.neighbors_of(key), graph.connected_edges(key)),
        HoverTarget::Edge(key) => match graph.edge_endpoints(key) {
            Some((from, to)) => (vec![from, to], Vec::new()),
            None => (Vec::new(), Vec::new()),
        },
    };
    for key in graph.node_keys() {
        graph.set_node_flag(key, ClassFlags::UNHOVER, true);
    }
    for key in graph.edge_keys() {
        graph.set_edge_flag(key, ClassFlags::UNHOVER, true);
    }
    for key in nodes {
        graph.set_node_flag(key, ClassFlags::UNHOVER, false);
        graph.set_node_flag(key, ClassFlags::CONNECTED_HOVER, true);
    }
    for key in edges {
        graph.set_edge_flag(key, ClassFlags::UNHOVER, false);
        graph.set_edge_flag(key, ClassFlags::CONNECTED_HOVER, true);
    }
    match target {
        HoverTarget::Node(key) => {
            graph.set_node_flag(key, ClassFlags::UNHOVER | ClassFlags::CONNECTED_HOVER, false);
            graph.set_node_flag(key, ClassFlags::HOVER, true);
        },
        HoverTarget::Edge(key) => {
            graph.set_edge_flag(key, ClassFlags::UNHOVER, false);
            graph.set_edge_flag(key, ClassFlags::HOVER, true);
        },
    }
}
