//! Tree events.
//!
//! Events are fire-and-forget: they are broadcast to every subscriber and
//! dropped when nobody listens.

use tokio::sync::broadcast;

use crate::id::NodeId;

/// Capacity of the event channel. Slow subscribers lag instead of blocking.
pub(crate) const EVENT_CAPACITY: usize = 256;

/// What happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeEventKind {
    /// A child load finished, including loads that returned no children.
    LoadNodeChildren,
    /// The node received the focused slot.
    Focus,
    /// The node lost the focused slot.
    Blur,
    Expand,
    Collapse,
    Activate,
    Deactivate,
    Select,
    Deselect,
    /// The hidden set was rebuilt by a filter. Carries the first root.
    ChangeFilter,
}

/// An event emitted by a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEvent {
    pub kind: TreeEventKind,
    /// The node the event is about.
    pub node: NodeId,
}

impl TreeEvent {
    pub fn new(kind: TreeEventKind, node: impl Into<NodeId>) -> Self {
        Self {
            kind,
            node: node.into(),
        }
    }
}

/// Sending half of the tree event bus.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<TreeEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn fire(&self, kind: TreeEventKind, node: &NodeId) {
        log::trace!("event {:?} for '{}'", kind, node);
        // No receivers is fine.
        let _ = self.sender.send(TreeEvent::new(kind, node));
    }
}
