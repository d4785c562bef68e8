/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! ActionRegistry: action catalogue for the graph context menu.
//!
//! The context menu draws its content from [`list_actions_for_context`]
//! rather than from a hardcoded list. Each returned [`ActionEntry`] carries
//! enough metadata for a surface to render the action and decide whether it
//! is currently enabled.

use crate::app::ViewIntent;
use crate::graph::NodeKey;
use crate::host::DocumentHandle;

/// Logical grouping of actions, used for separators and ordering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionCategory {
    Node,
    Selection,
}

impl ActionCategory {
    /// Display label for the category group heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Selection => "Selection",
        }
    }
}

/// Stable identifier for a registered action.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionId {
    Expand,
    Hide,
    Pin,
    Unpin,
    SelectAll,
    Invert,
    SelectNeighbors,
}

impl ActionId {
    pub const ALL: [Self; 7] = [
        Self::Expand,
        Self::Hide,
        Self::Pin,
        Self::Unpin,
        Self::SelectAll,
        Self::Invert,
        Self::SelectNeighbors,
    ];

    /// Full label for the context menu.
    pub fn label(self) -> &'static str {
        match self {
            Self::Expand => "Expand selection",
            Self::Hide => "Hide selection",
            Self::Pin => "Pin selection",
            Self::Unpin => "Unpin selection",
            Self::SelectAll => "Select all",
            Self::Invert => "Invert selection",
            Self::SelectNeighbors => "Select neighbors",
        }
    }

    /// Keyboard shortcut shown next to the label.
    pub fn shortcut(self) -> &'static str {
        match self {
            Self::Expand => "E",
            Self::Hide => "H",
            Self::Pin => "P",
            Self::Unpin => "U",
            Self::SelectAll => "A",
            Self::Invert => "I",
            Self::SelectNeighbors => "N",
        }
    }

    pub fn category(self) -> ActionCategory {
        match self {
            Self::Expand | Self::Hide | Self::Pin | Self::Unpin => ActionCategory::Node,
            Self::SelectAll | Self::Invert | Self::SelectNeighbors => ActionCategory::Selection,
        }
    }

    /// Intent dispatched when the action is chosen.
    pub fn intent(self) -> ViewIntent {
        match self {
            Self::Expand => ViewIntent::ExpandSelection,
            Self::Hide => ViewIntent::RemoveSelection,
            Self::Pin => ViewIntent::PinSelection,
            Self::Unpin => ViewIntent::UnpinSelection,
            Self::SelectAll => ViewIntent::SelectAll,
            Self::Invert => ViewIntent::InvertSelection,
            Self::SelectNeighbors => ViewIntent::SelectNeighbors,
        }
    }
}

/// Context passed to [`list_actions_for_context`] to drive enabled/disabled
/// state.
#[derive(Clone, Debug, Default)]
pub struct ActionContext {
    /// Right-clicked node, if any. `None` means the background was clicked.
    pub target_node: Option<NodeKey>,
    pub selected: usize,
    /// Whether any selected node is pinned.
    pub any_selected_pinned: bool,
    /// Whether any selected node is not pinned.
    pub any_selected_unpinned: bool,
    pub node_count: usize,
}

/// A single resolved action entry returned by [`list_actions_for_context`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionEntry {
    /// Stable action identifier used for dispatch.
    pub id: ActionId,
    /// Whether the action is executable in the current context.
    pub enabled: bool,
}

/// Return all context menu actions with enabled/disabled state resolved.
///
/// Node actions come first, then selection actions. Disabled actions are
/// included so surfaces can show them greyed out rather than hiding them.
pub fn list_actions_for_context(context: &ActionContext) -> Vec<ActionEntry> {
    use ActionId::*;

    let any_selected = context.selected > 0;
    let all: [(ActionId, bool); 7] = [
        // Node
        (Expand, any_selected),
        (Hide, any_selected),
        (Pin, context.any_selected_unpinned),
        (Unpin, context.any_selected_pinned),
        // Selection
        (SelectAll, context.node_count > 0 && context.selected < context.node_count),
        (Invert, context.node_count > 0),
        (SelectNeighbors, any_selected),
    ];

    all.into_iter()
        .map(|(id, enabled)| ActionEntry { id, enabled })
        .collect()
}

/// Resolved context menu: the action list plus the document behind a single
/// right-clicked core node, for host-contributed items.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextMenu {
    pub entries: Vec<ActionEntry>,
    pub host_target: Option<DocumentHandle>,
}

impl ContextMenu {
    pub fn enabled(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.id)
    }

    pub fn is_enabled(&self, id: ActionId) -> bool {
        self.enabled().any(|enabled| enabled == id)
    }
}
