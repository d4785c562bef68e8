/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Input handling for the graph view.
//!
//! Keyboard shortcuts are handled here. Pointer interaction (hover, drag,
//! taps, double-click) arrives as [`crate::render::GraphAction`]s.

use crate::app::ViewIntent;

/// A key as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Ctrl, Alt or Meta held; such chords belong to the host.
    fn any_command(self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn char(ch: char) -> Self {
        Self::new(Key::Char(ch))
    }
}

/// Keyboard actions collected from key presses.
///
/// This struct decouples input detection from action application (pure
/// state mutation), making actions testable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyboardActions {
    pub expand_selection: bool,
    pub hide_selection: bool,
    pub invert_selection: bool,
    pub select_all: bool,
    pub select_neighbors: bool,
    pub pin_selected: bool,
    pub unpin_selected: bool,
    pub clear_selection: bool,
}

impl KeyboardActions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Collect keyboard actions from this frame's key presses. Nothing is
/// collected unless the graph view has keyboard focus.
pub fn collect_actions(presses: &[KeyPress], view_focused: bool) -> KeyboardActions {
    let mut actions = KeyboardActions::default();
    if !view_focused {
        return actions;
    }

    for press in presses {
        if press.modifiers.any_command() {
            continue;
        }
        match press.key {
            Key::Char(ch) => match ch.to_ascii_lowercase() {
                // E: expand selection
                'e' => actions.expand_selection = true,
                // H: hide selection
                'h' => actions.hide_selection = true,
                'i' => actions.invert_selection = true,
                'a' => actions.select_all = true,
                'n' => actions.select_neighbors = true,
                'p' => actions.pin_selected = true,
                'u' => actions.unpin_selected = true,
                _ => {},
            },
            // Backspace: hide selection
            Key::Backspace => actions.hide_selection = true,
            Key::Escape => actions.clear_selection = true,
            Key::Other => {},
        }
    }
    actions
}

/// Convert keyboard actions to view intents without applying them.
///
/// Selection transforms come before structural changes so a frame that
/// presses `a` then `h` hides everything.
pub fn intents_from_actions(actions: &KeyboardActions) -> Vec<ViewIntent> {
    let mut intents = Vec::new();
    if actions.clear_selection {
        intents.push(ViewIntent::ClearSelection);
    }
    if actions.select_all {
        intents.push(ViewIntent::SelectAll);
    }
    if actions.invert_selection {
        intents.push(ViewIntent::InvertSelection);
    }
    if actions.select_neighbors {
        intents.push(ViewIntent::SelectNeighbors);
    }
    if actions.pin_selected {
        intents.push(ViewIntent::PinSelection);
    }
    if actions.unpin_selected {
        intents.push(ViewIntent::UnpinSelection);
    }
    if actions.expand_selection {
        intents.push(ViewIntent::ExpandSelection);
    }
    if actions.hide_selection {
        intents.push(ViewIntent::RemoveSelection);
    }
    intents
}
