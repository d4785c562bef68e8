/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! View-side controllers that read and decorate the graph.

pub mod active_file;
pub mod camera;
pub mod events;
pub mod hover;
pub mod layout;

pub use active_file::ActiveFileTracker;
pub use camera::Camera;
pub use events::{EventBus, SubscriptionId, ViewEvent, ViewEventKind};
pub use hover::{HoverController, HoverTarget, Popup};
pub use layout::{ForceLayout, LayoutEngine, LayoutOrchestrator, LayoutStep};
