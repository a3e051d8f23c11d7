//! Tri-state selection.
//!
//! With tri-state on, only leaf-like nodes store selection. A parent reads
//! as selected when any visible child is selected, reads as all-selected
//! only when every child (hidden ones included) is all-selected, and
//! writing its selection fans out over the visible children.

use crate::field::TreeRecord;
use crate::id::NodeId;

use super::state::TreeInner;

impl<R: TreeRecord> TreeInner<R> {
    /// Whether `id` holds selection state directly.
    pub(crate) fn is_selectable(&self, id: &NodeId) -> bool {
        let loaded = self.entry(id).is_some_and(|entry| entry.children.is_some());
        !self.has_children(id) || !loaded || !self.options.use_tri_state
    }

    pub(crate) fn is_selected(&self, id: &NodeId) -> bool {
        if self.is_selectable(id) {
            return self.state.is_selected(id);
        }
        self.visible_children(id, true)
            .unwrap_or_default()
            .iter()
            .any(|child| self.is_selected(child))
    }

    pub(crate) fn is_all_selected(&self, id: &NodeId) -> bool {
        if self.is_selectable(id) {
            return self.state.is_selected(id);
        }
        self.visible_children(id, false)
            .unwrap_or_default()
            .iter()
            .all(|child| self.is_all_selected(child))
    }

    pub(crate) fn is_partially_selected(&self, id: &NodeId) -> bool {
        self.is_selected(id) && !self.is_all_selected(id)
    }

    pub(crate) fn set_selected(&mut self, id: &NodeId, value: bool) {
        if self.is_selectable(id) {
            self.set_selected_node(id, value);
            return;
        }
        for child in self.visible_children(id, true).unwrap_or_default() {
            self.set_selected(&child, value);
        }
    }
}
