/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Incremental neighbourhood graph view over linked documents.
//!
//! The live [`graph::Graph`] is the single source of visual truth. Data
//! stores contribute neighbourhoods asynchronously; [`app::GraphView`]
//! merges them in without disturbing user state (pins, expansion,
//! selection, active-file highlighting) and keeps layout, hover previews
//! and notifications consistent with it.

pub mod app;
pub mod config;
pub mod datastore;
pub mod graph;
pub mod host;
pub mod input;
pub mod render;
pub mod view;

pub use app::{ExpansionReport, GraphView, ViewError, ViewIntent};
pub use config::ViewSettings;
pub use graph::identity::{CORE_STORE_ID, Identity};
pub use graph::{Graph, NodeKey};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
