/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Typed notifications emitted by the view.
//!
//! Consumers subscribe per event kind (or by the kind's wire name) and get a
//! crossbeam receiver. Dropping the receiver is as good as unsubscribing:
//! the bus prunes disconnected subscribers on the next emit.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::trace;

use crate::graph::Identity;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The view is initialized; carries a summary of the graph it shows.
    VizReady {
        revision: u64,
        nodes: usize,
        edges: usize,
    },
    /// A stylesheet was (re)generated.
    Stylesheet(String),
    Expand(Vec<Identity>),
    /// Nodes removed from the graph.
    Hide(Vec<Identity>),
    Pin(Vec<Identity>),
    Unpin(Vec<Identity>),
    SelectChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewEventKind {
    VizReady,
    Stylesheet,
    Expand,
    Hide,
    Pin,
    Unpin,
    SelectChange,
}

impl ViewEventKind {
    pub const ALL: [Self; 7] = [
        Self::VizReady,
        Self::Stylesheet,
        Self::Expand,
        Self::Hide,
        Self::Pin,
        Self::Unpin,
        Self::SelectChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::VizReady => "vizReady",
            Self::Stylesheet => "stylesheet",
            Self::Expand => "expand",
            Self::Hide => "hide",
            Self::Pin => "pin",
            Self::Unpin => "unpin",
            Self::SelectChange => "selectChange",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl ViewEvent {
    pub fn kind(&self) -> ViewEventKind {
        match self {
            Self::VizReady { .. } => ViewEventKind::VizReady,
            Self::Stylesheet(_) => ViewEventKind::Stylesheet,
            Self::Expand(_) => ViewEventKind::Expand,
            Self::Hide(_) => ViewEventKind::Hide,
            Self::Pin(_) => ViewEventKind::Pin,
            Self::Unpin(_) => ViewEventKind::Unpin,
            Self::SelectChange => ViewEventKind::SelectChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    /// `None` receives every kind.
    kind: Option<ViewEventKind>,
    tx: Sender<ViewEvent>,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, kind: Option<ViewEventKind>) -> (SubscriptionId, Receiver<ViewEvent>) {
        let (tx, rx) = unbounded();
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber { id, kind, tx });
        (id, rx)
    }

    pub fn subscribe(&mut self, kind: ViewEventKind) -> (SubscriptionId, Receiver<ViewEvent>) {
        self.add(Some(kind))
    }

    /// Subscribe by wire name (`"expand"`, `"selectChange"`, ...).
    pub fn subscribe_name(&mut self, name: &str) -> Option<(SubscriptionId, Receiver<ViewEvent>)> {
        ViewEventKind::from_name(name).map(|kind| self.subscribe(kind))
    }

    pub fn subscribe_all(&mut self) -> (SubscriptionId, Receiver<ViewEvent>) {
        self.add(None)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit(&mut self, event: ViewEvent) {
        let kind = event.kind();
        trace!("Emitting {}", kind.name());
        self.subscribers.retain(|subscriber| {
            if subscriber.kind.is_some_and(|wanted| wanted != kind) {
                return true;
            }
            subscriber.tx.send(event.clone()).is_ok()
        });
    }
}
