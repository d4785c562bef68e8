/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Class vocabulary carried by nodes and edges.
//!
//! State bits the view engine reasons about are typed flags; anything else a
//! data store attaches (`note`, `dangling`, `tag-*`, `visited`, ...) is kept
//! verbatim as a custom class. Both render back to the class-name vocabulary
//! consumed by stylesheets.

use std::collections::BTreeSet;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u16 {
        /// Position locked and excluded from simulation.
        const PINNED = 1 << 0;
        /// Neighbourhood has been fetched and merged.
        const EXPANDED = 1 << 1;
        const SELECTED = 1 << 2;
        const ACTIVE_FILE = 1 << 3;
        const INACTIVE_FILE = 1 << 4;
        const CONNECTED_ACTIVE_FILE = 1 << 5;
        const HOVER = 1 << 6;
        const UNHOVER = 1 << 7;
        const CONNECTED_HOVER = 1 << 8;
    }
}

const VOCABULARY: [(ClassFlags, &str); 9] = [
    (ClassFlags::PINNED, "pinned"),
    (ClassFlags::EXPANDED, "expanded"),
    (ClassFlags::SELECTED, "selected"),
    (ClassFlags::ACTIVE_FILE, "active-file"),
    (ClassFlags::INACTIVE_FILE, "inactive-file"),
    (ClassFlags::CONNECTED_ACTIVE_FILE, "connected-active-file"),
    (ClassFlags::HOVER, "hover"),
    (ClassFlags::UNHOVER, "unhover"),
    (ClassFlags::CONNECTED_HOVER, "connected-hover"),
];

impl ClassFlags {
    /// User state a re-fetch must never clear.
    pub const PROTECTED: Self = Self::PINNED.union(Self::EXPANDED);

    pub const ACTIVE_STATE: Self = Self::ACTIVE_FILE
        .union(Self::INACTIVE_FILE)
        .union(Self::CONNECTED_ACTIVE_FILE);

    pub const HOVER_STATE: Self = Self::HOVER
        .union(Self::UNHOVER)
        .union(Self::CONNECTED_HOVER);

    /// View-owned state; data stores have no say over it.
    pub const VIEW_STATE: Self = Self::SELECTED
        .union(Self::ACTIVE_STATE)
        .union(Self::HOVER_STATE);

    /// Flags only the view sets. Incoming records never carry them; a node
    /// is `expanded` only once its neighbourhood has been merged.
    pub const VIEW_OWNED: Self = Self::VIEW_STATE.union(Self::EXPANDED);

    pub fn from_class_name(name: &str) -> Option<Self> {
        VOCABULARY
            .iter()
            .find(|(_, class)| *class == name)
            .map(|(flag, _)| *flag)
    }

    /// Class names for the set flags, in vocabulary order.
    pub fn class_names(self) -> impl Iterator<Item = &'static str> {
        VOCABULARY
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, class)| class)
    }
}

/// Classes attached to one graph element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classes {
    flags: ClassFlags,
    custom: BTreeSet<String>,
}

impl Classes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse class names, routing known vocabulary to flags.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = Self::new();
        for name in names {
            classes.add_name(name.as_ref());
        }
        classes
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn custom(&self) -> impl Iterator<Item = &str> {
        self.custom.iter().map(String::as_str)
    }

    pub fn contains(&self, flag: ClassFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn has_name(&self, name: &str) -> bool {
        match ClassFlags::from_class_name(name) {
            Some(flag) => self.flags.contains(flag),
            None => self.custom.contains(name),
        }
    }

    pub fn insert(&mut self, flag: ClassFlags) {
        self.flags.insert(flag);
    }

    pub fn remove(&mut self, flag: ClassFlags) {
        self.flags.remove(flag);
    }

    pub fn set(&mut self, flag: ClassFlags, value: bool) {
        self.flags.set(flag, value);
    }

    pub fn add_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match ClassFlags::from_class_name(name) {
            Some(flag) => self.flags.insert(flag),
            None => {
                self.custom.insert(name.to_string());
            },
        }
    }

    pub fn remove_name(&mut self, name: &str) {
        match ClassFlags::from_class_name(name) {
            Some(flag) => self.flags.remove(flag),
            None => {
                self.custom.remove(name);
            },
        }
    }

    /// Replace these classes with `incoming`, keeping protected and
    /// view-owned flags from `self`.
    pub fn merge_incoming(&mut self, incoming: &Classes) {
        let kept = self.flags & (ClassFlags::PROTECTED | ClassFlags::VIEW_STATE);
        self.flags = kept | (incoming.flags - ClassFlags::VIEW_OWNED);
        self.custom = incoming.custom.clone();
    }

    /// These classes as a data store may set them on a new element.
    pub fn without_view_state(mut self) -> Self {
        self.flags -= ClassFlags::VIEW_OWNED;
        self
    }

    /// Full class-name list: vocabulary flags first, then custom classes.
    pub fn names(&self) -> Vec<String> {
        self.flags
            .class_names()
            .map(str::to_string)
            .chain(self.custom.iter().cloned())
            .collect()
    }

    /// Same as [`Classes::names`] minus ephemeral highlight state.
    pub fn persistent_names(&self) -> Vec<String> {
        let flags = self.flags - ClassFlags::ACTIVE_STATE - ClassFlags::HOVER_STATE;
        flags
            .class_names()
            .map(str::to_string)
            .chain(self.custom.iter().cloned())
            .collect()
    }
}
