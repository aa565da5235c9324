use eframe::egui::{Pos2, Vec2};
use log::debug;

use super::GraphEngine;
use crate::graph::NodeIndex;

/// Who decides a node's position. A drag pin lasts until the pointer is
/// released; a permanent pin lasts until the node is dragged again or unpinned.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PinState {
    #[default]
    Free,
    DragPinned(Vec2),
    PermanentlyPinned(Vec2),
}

impl PinState {
    pub fn position(self) -> Option<Vec2> {
        match self {
            Self::Free => None,
            Self::DragPinned(position) | Self::PermanentlyPinned(position) => Some(position),
        }
    }

    pub fn is_permanent(self) -> bool {
        matches!(self, Self::PermanentlyPinned(_))
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DragSession {
    pub(super) node: NodeIndex,
    /// Node position minus the pointer's world position when the drag began.
    pub(super) grab_offset: Vec2,
}

impl GraphEngine {
    /// Topmost visible node under a point given in viewport coordinates.
    pub fn node_at(&self, screen: Pos2) -> Option<NodeIndex> {
        if self.detached {
            return None;
        }

        let world = self.view.screen_to_world(screen);
        let radius = self.config.style.node_radius;
        self.visible
            .nodes
            .iter()
            .rev()
            .copied()
            .find(|&index| {
                self.nodes
                    .get(index)
                    .is_some_and(|node| (node.world_pos - world).length() <= radius)
            })
    }

    /// Grabs the node under `screen`. The layout warms up unless the user paused it.
    pub fn drag_start(&mut self, screen: Pos2) -> Option<NodeIndex> {
        if self.detached {
            return None;
        }
        self.cancel_drag();

        let index = self.node_at(screen)?;
        let world = self.view.screen_to_world(screen);
        let node = &mut self.nodes[index];
        node.pin = PinState::DragPinned(node.world_pos);
        node.velocity = Vec2::ZERO;
        self.drag = Some(DragSession {
            node: index,
            grab_offset: node.world_pos - world,
        });

        let target = self.config.simulation.drag_alpha_target;
        self.simulation.set_alpha_target(target);
        self.simulation.reheat(target);
        debug!("drag started on node {}", self.graph.nodes[index].id);
        Some(index)
    }

    /// Moves the dragged node under the pointer. Takes effect before the next tick.
    pub fn drag_move(&mut self, screen: Pos2) -> bool {
        let Some(session) = self.drag.filter(|_| !self.detached) else {
            return false;
        };

        let position = self.view.screen_to_world(screen) + session.grab_offset;
        let node = &mut self.nodes[session.node];
        node.pin = PinState::DragPinned(position);
        node.world_pos = position;
        node.velocity = Vec2::ZERO;
        true
    }

    /// Releases the dragged node. With `permanent` set the node stays where it
    /// was dropped; otherwise it rejoins the layout.
    pub fn drag_end(&mut self, permanent: bool) -> Option<NodeIndex> {
        let session = self.drag.take()?;
        self.simulation.set_alpha_target(0.0);

        let node = &mut self.nodes[session.node];
        node.pin = if permanent {
            PinState::PermanentlyPinned(node.world_pos)
        } else {
            PinState::Free
        };
        debug!(
            "drag ended on node {} ({})",
            self.graph.nodes[session.node].id,
            if permanent { "pinned" } else { "released" }
        );
        Some(session.node)
    }

    pub(super) fn cancel_drag(&mut self) {
        if self.drag.is_some() {
            self.drag_end(false);
        }
    }

    pub(super) fn cancel_hidden_drag(&mut self) {
        if let Some(session) = self.drag
            && !self.visible.contains_node(session.node)
        {
            debug!("dragged node left the visible subgraph");
            self.cancel_drag();
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_node(&self) -> Option<NodeIndex> {
        self.drag.map(|session| session.node)
    }

    pub fn pin_state(&self, index: NodeIndex) -> Option<PinState> {
        self.nodes.get(index).map(|node| node.pin)
    }

    /// Releases a pin. Returns `false` if the node was free or is being dragged.
    pub fn unpin(&mut self, index: NodeIndex) -> bool {
        if self.detached || self.dragged_node() == Some(index) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(index) else {
            return false;
        };
        if node.pin == PinState::Free {
            return false;
        }

        node.pin = PinState::Free;
        self.simulation.reheat(self.config.simulation.pin_reheat_alpha);
        true
    }

    pub fn unpin_at(&mut self, screen: Pos2) -> bool {
        self.node_at(screen).is_some_and(|index| self.unpin(index))
    }

    /// Releases every permanent pin and returns how many were released.
    pub fn clear_pins(&mut self) -> usize {
        if self.detached {
            return 0;
        }

        let mut released = 0;
        for node in &mut self.nodes {
            if node.pin.is_permanent() {
                node.pin = PinState::Free;
                released += 1;
            }
        }
        if released > 0 {
            self.simulation.reheat(self.config.simulation.pin_reheat_alpha);
        }
        released
    }
}
