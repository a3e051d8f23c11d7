//! Mouse action dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::field::TreeRecord;

use super::node::TreeNode;
use super::state::Tree;

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl or meta: the "add to selection" chord.
    pub fn is_multi(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// The pointer event that triggered an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerEvent {
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(modifiers: Modifiers) -> Self {
        Self { modifiers }
    }
}

/// Every pointer action a rendered node can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Click,
    DblClick,
    ContextMenu,
    /// The expander toggle was clicked.
    Expand,
    CheckboxClick,
    DragStart,
    Drag,
    DragEnd,
    DragOver,
    DragLeave,
    DragEnter,
    Drop,
    MouseOver,
    MouseOut,
}

/// Handler invoked with the tree, the node, the event and optional payload.
pub type ActionHandler<R> =
    Arc<dyn Fn(&Tree<R>, &TreeNode<R>, &PointerEvent, Option<&Value>) + Send + Sync>;

/// Maps mouse actions to handlers.
pub struct ActionMapping<R: TreeRecord> {
    handlers: HashMap<MouseAction, ActionHandler<R>>,
}

impl<R: TreeRecord> ActionMapping<R> {
    /// A mapping with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn get(&self, action: MouseAction) -> Option<&ActionHandler<R>> {
        self.handlers.get(&action)
    }

    /// Map `action` to `handler`, replacing any previous one.
    pub fn on(
        mut self,
        action: MouseAction,
        handler: impl Fn(&Tree<R>, &TreeNode<R>, &PointerEvent, Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(action, Arc::new(handler));
        self
    }

    pub fn set(&mut self, action: MouseAction, handler: ActionHandler<R>) {
        self.handlers.insert(action, handler);
    }

    pub fn remove(&mut self, action: MouseAction) -> Option<ActionHandler<R>> {
        self.handlers.remove(&action)
    }
}

impl<R: TreeRecord> Default for ActionMapping<R> {
    fn default() -> Self {
        Self::empty()
            .on(MouseAction::Click, handlers::toggle_active_multi)
            .on(MouseAction::Expand, handlers::toggle_expanded)
            .on(MouseAction::CheckboxClick, handlers::toggle_selected)
    }
}

impl<R: TreeRecord> Clone for ActionMapping<R> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<R: TreeRecord> fmt::Debug for ActionMapping<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.handlers.keys().collect();
        actions.sort_by_key(|action| format!("{:?}", action));
        f.debug_struct("ActionMapping")
            .field("actions", &actions)
            .finish()
    }
}

/// Built-in handlers.
pub mod handlers {
    use serde_json::Value;

    use super::PointerEvent;
    use crate::field::TreeRecord;
    use crate::tree::{Tree, TreeNode};

    /// Toggle activation; ctrl or meta keeps other nodes active.
    pub fn toggle_active_multi<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        node.toggle_activated(event.modifiers.is_multi());
    }

    /// Toggle activation of this node only.
    pub fn toggle_active<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        _event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        node.toggle_activated(false);
    }

    pub fn toggle_expanded<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        _event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        if node.has_children() {
            node.toggle_expanded();
        }
    }

    pub fn toggle_selected<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        _event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        node.toggle_selected();
    }

    /// Activate the node and make sure it is reachable.
    pub fn activate_and_show<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        node.set_active_and_visible(event.modifiers.is_multi());
    }

    pub fn focus<R: TreeRecord>(
        _tree: &Tree<R>,
        node: &TreeNode<R>,
        _event: &PointerEvent,
        _data: Option<&Value>,
    ) {
        node.focus(false);
    }
}
