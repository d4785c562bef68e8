/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Render-side surfaces: pointer actions, context menu and stylesheet.
//!
//! The host renderer reports pointer interaction as [`GraphAction`]s.
//! Converting them to intents is separate from applying them, making graph
//! interactions testable without a rendering context.

use euclid::default::{Point2D, Size2D, Vector2D};

use crate::app::{SelectionUpdateMode, ViewIntent};
use crate::graph::NodeKey;
use crate::view::HoverTarget;

pub mod action_registry;
pub mod stylesheet;

pub use action_registry::{ActionCategory, ActionContext, ActionEntry, ActionId, ContextMenu};
pub use stylesheet::{DefaultStylesheet, StylesheetProvider};

/// Graph interaction action resolved from renderer pointer events.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphAction {
    /// Single click on a node.
    SelectNode {
        key: NodeKey,
        multi_select: bool,
    },
    /// Double click on a node.
    DoubleClickNode(NodeKey),
    /// Click that asks the host to open the node's document.
    OpenNode(NodeKey),
    LassoSelect {
        keys: Vec<NodeKey>,
        mode: SelectionUpdateMode,
    },
    /// Tap on empty canvas.
    BackgroundTap,
    PointerEnter(HoverTarget),
    PointerLeave(HoverTarget),
    PointerEnterPopup,
    PointerLeavePopup,
    DragStart(NodeKey),
    DragMove(Point2D<f32>),
    DragEnd,
    Pan(Vector2D<f32>),
    Zoom(f32),
    Resize(Size2D<f32>),
}

/// Convert resolved graph actions to view intents without applying them.
pub fn intents_from_graph_actions(actions: Vec<GraphAction>) -> Vec<ViewIntent> {
    let mut intents = Vec::with_capacity(actions.len());
    for action in actions {
        match action {
            GraphAction::SelectNode { key, multi_select } => {
                intents.push(ViewIntent::SelectNode { key, multi_select });
            },
            GraphAction::DoubleClickNode(key) => {
                intents.push(ViewIntent::ExpandNodes { keys: vec![key] });
            },
            GraphAction::OpenNode(key) => {
                intents.push(ViewIntent::ActivateNode { key });
            },
            GraphAction::LassoSelect { keys, mode } => {
                intents.push(ViewIntent::UpdateSelection { keys, mode });
            },
            GraphAction::BackgroundTap => intents.push(ViewIntent::BackgroundTap),
            GraphAction::PointerEnter(target) => intents.push(ViewIntent::HoverEnter(target)),
            GraphAction::PointerLeave(target) => intents.push(ViewIntent::HoverLeave(target)),
            GraphAction::PointerEnterPopup => intents.push(ViewIntent::PointerEnterPopup),
            GraphAction::PointerLeavePopup => intents.push(ViewIntent::PointerLeavePopup),
            GraphAction::DragStart(key) => intents.push(ViewIntent::BeginDrag { key }),
            GraphAction::DragMove(position) => intents.push(ViewIntent::DragTo { position }),
            GraphAction::DragEnd => intents.push(ViewIntent::EndDrag),
            GraphAction::Pan(delta) => intents.push(ViewIntent::Pan { delta }),
            GraphAction::Zoom(zoom) => intents.push(ViewIntent::SetZoom { zoom }),
            GraphAction::Resize(viewport) => intents.push(ViewIntent::Resize { viewport }),
        }
    }
    intents
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::stable_graph::NodeIndex;

    #[test]
    fn test_double_click_expands_node() {
        let key = NodeIndex::new(3);
        let intents = intents_from_graph_actions(vec![GraphAction::DoubleClickNode(key)]);
        assert_eq!(intents, vec![ViewIntent::ExpandNodes { keys: vec![key] }]);
    }

    #[test]
    fn test_drag_sequence_maps_in_order() {
        let key = NodeIndex::new(0);
        let intents = intents_from_graph_actions(vec![
            GraphAction::DragStart(key),
            GraphAction::DragMove(Point2D::new(4.0, 2.0)),
            GraphAction::DragEnd,
        ]);
        assert_eq!(
            intents,
            vec![
                ViewIntent::BeginDrag { key },
                ViewIntent::DragTo {
                    position: Point2D::new(4.0, 2.0)
                },
                ViewIntent::EndDrag,
            ]
        );
    }

    #[test]
    fn test_lasso_select_action_maps_to_intent() {
        let keys = vec![NodeIndex::new(0), NodeIndex::new(1)];
        let intents = intents_from_graph_actions(vec![GraphAction::LassoSelect {
            keys: keys.clone(),
            mode: SelectionUpdateMode::Add,
        }]);
        assert_eq!(
            intents,
            vec![ViewIntent::UpdateSelection {
                keys,
                mode: SelectionUpdateMode::Add
            }]
        );
    }

    #[test]
    fn test_no_actions_no_intents() {
        assert!(intents_from_graph_actions(Vec::new()).is_empty());
    }
}
