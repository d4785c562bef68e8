/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Stylesheet generation for the class vocabulary.

use std::fmt::Write;

use crate::config::ViewSettings;
use crate::graph::ClassFlags;

/// Produces the style description the renderer consumes.
pub trait StylesheetProvider: Send + Sync {
    fn stylesheet(&self, settings: &ViewSettings) -> String;
}

/// Selector/declaration sheet with one rule per class, sized from the
/// `degree` and `nameLength` node metrics.
#[derive(Debug, Clone)]
pub struct DefaultStylesheet {
    pub min_node_size: f32,
    pub max_node_size: f32,
    /// Degree at which nodes reach `max_node_size`.
    pub degree_cap: u32,
}

impl Default for DefaultStylesheet {
    fn default() -> Self {
        Self {
            min_node_size: 10.0,
            max_node_size: 40.0,
            degree_cap: 40,
        }
    }
}

fn class_rule(flag: ClassFlags) -> &'static str {
    if flag == ClassFlags::PINNED {
        "border-style: dashed; border-width: 2"
    } else if flag == ClassFlags::EXPANDED {
        "border-width: 2; border-color: #7f6df2"
    } else if flag == ClassFlags::SELECTED {
        "overlay-opacity: 0.2; overlay-color: #7f6df2"
    } else if flag == ClassFlags::ACTIVE_FILE {
        "background-color: #7f6df2; font-weight: bold"
    } else if flag == ClassFlags::CONNECTED_ACTIVE_FILE {
        "opacity: 1"
    } else if flag == ClassFlags::INACTIVE_FILE {
        "opacity: 0.6"
    } else if flag == ClassFlags::HOVER {
        "background-color: #a89cf7; z-index: 10"
    } else if flag == ClassFlags::CONNECTED_HOVER {
        "opacity: 1"
    } else {
        "opacity: 0.3"
    }
}

impl StylesheetProvider for DefaultStylesheet {
    fn stylesheet(&self, settings: &ViewSettings) -> String {
        let mut sheet = String::new();
        let _ = writeln!(
            sheet,
            "node {{ label: data(name); width: mapData(degree, 0, {cap}, {min}, {max}); \
             height: mapData(degree, 0, {cap}, {min}, {max}); \
             font-size: mapData(nameLength, 0, 40, 14, 8); }}",
            cap = self.degree_cap,
            min = self.min_node_size,
            max = self.max_node_size,
        );
        let _ = writeln!(sheet, "edge {{ width: 1; curve-style: straight; }}");
        let _ = writeln!(sheet, "node.note {{ background-color: #bbbbbb; }}");
        let _ = writeln!(
            sheet,
            "node.dangling {{ background-color: #eeeeee; border-style: dotted; }}"
        );
        for flag in ClassFlags::all().iter() {
            for class in flag.class_names() {
                let _ = writeln!(sheet, ".{class} {{ {}; }}", class_rule(flag));
            }
        }
        if !settings.hover_edges {
            let _ = writeln!(sheet, "edge.hover, edge.unhover {{ opacity: 1; }}");
        }
        sheet
    }
}
