//! Canonical per-tree UI state.
//!
//! Nodes never store whether they are expanded, selected, active, focused or
//! hidden; they look it up here by id. Every mutator reports whether it
//! changed anything so callers can decide which events to fire.

use std::collections::HashSet;

use crate::id::NodeId;

#[derive(Debug, Clone, Default)]
pub struct TreeStateSets {
    pub(crate) expanded: HashSet<NodeId>,
    pub(crate) selected: HashSet<NodeId>,
    pub(crate) hidden: HashSet<NodeId>,
    /// Active nodes in activation order.
    pub(crate) active: Vec<NodeId>,
    pub(crate) focused: Option<NodeId>,
    /// Whether the tree as a whole has input focus.
    pub(crate) has_focus: bool,
}

impl TreeStateSets {
    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_hidden(&self, id: &NodeId) -> bool {
        self.hidden.contains(id)
    }

    pub fn is_active(&self, id: &NodeId) -> bool {
        self.active.contains(id)
    }

    pub fn is_focused(&self, id: &NodeId) -> bool {
        self.focused.as_ref() == Some(id)
    }

    pub fn focused(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }

    pub fn set_expanded(&mut self, id: &NodeId, value: bool) -> bool {
        toggle_membership(&mut self.expanded, id, value)
    }

    pub fn set_selected(&mut self, id: &NodeId, value: bool) -> bool {
        toggle_membership(&mut self.selected, id, value)
    }

    pub fn set_hidden(&mut self, id: &NodeId, value: bool) -> bool {
        toggle_membership(&mut self.hidden, id, value)
    }

    /// Update the active set.
    ///
    /// Multi mode adds or removes `id` alone. Single mode makes `id` the only
    /// active node, or clears the set when deactivating. Returns the ids that
    /// stopped being active.
    pub fn set_active(&mut self, id: &NodeId, value: bool, multi: bool) -> Vec<NodeId> {
        if multi {
            if value {
                if !self.active.contains(id) {
                    self.active.push(id.clone());
                }
                Vec::new()
            } else {
                let before = self.active.len();
                self.active.retain(|active| active != id);
                if self.active.len() < before {
                    vec![id.clone()]
                } else {
                    Vec::new()
                }
            }
        } else if value {
            let removed: Vec<NodeId> = self.active.drain(..).filter(|active| active != id).collect();
            self.active.push(id.clone());
            removed
        } else {
            std::mem::take(&mut self.active)
        }
    }

    /// Replace the focused slot, returning the previous holder.
    pub fn set_focused(&mut self, id: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.focused, id)
    }

    /// Drop every trace of `id`.
    pub fn forget(&mut self, id: &NodeId) {
        self.expanded.remove(id);
        self.selected.remove(id);
        self.hidden.remove(id);
        self.active.retain(|active| active != id);
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
        }
    }

    /// Keep only ids accepted by `keep`.
    pub fn retain(&mut self, keep: impl Fn(&NodeId) -> bool) {
        self.expanded.retain(&keep);
        self.selected.retain(&keep);
        self.hidden.retain(&keep);
        self.active.retain(&keep);
        if self.focused.as_ref().is_some_and(|id| !keep(id)) {
            self.focused = None;
        }
    }

    /// Move every membership of `from` to `to`.
    pub fn rename(&mut self, from: &NodeId, to: &NodeId) {
        for set in [&mut self.expanded, &mut self.selected, &mut self.hidden] {
            if set.remove(from) {
                set.insert(to.clone());
            }
        }
        for active in &mut self.active {
            if active == from {
                *active = to.clone();
            }
        }
        if self.focused.as_ref() == Some(from) {
            self.focused = Some(to.clone());
        }
    }
}

fn toggle_membership(set: &mut HashSet<NodeId>, id: &NodeId, value: bool) -> bool {
    if value {
        set.insert(id.clone())
    } else {
        set.remove(id)
    }
}
