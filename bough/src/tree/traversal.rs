//! Traversal over the node arena.
//!
//! Nothing here fails: a detached node, a missing sibling or the end of the
//! tree is reported as `None`. The `skip_hidden` flag filters hidden nodes
//! out of every sibling and child list consulted.

use crate::field::TreeRecord;
use crate::id::NodeId;

use super::state::TreeInner;

impl<R: TreeRecord> TreeInner<R> {
    fn filter_hidden(&self, ids: &[NodeId], skip_hidden: bool) -> Vec<NodeId> {
        ids.iter()
            .filter(|id| !skip_hidden || !self.state.is_hidden(id))
            .cloned()
            .collect()
    }

    /// Top-level ids, optionally without hidden ones.
    pub(crate) fn root_ids(&self, skip_hidden: bool) -> Vec<NodeId> {
        self.filter_hidden(&self.roots, skip_hidden)
    }

    /// Loaded children of `id`. `None` when not loaded.
    pub(crate) fn visible_children(&self, id: &NodeId, skip_hidden: bool) -> Option<Vec<NodeId>> {
        let children = self.entry(id)?.children.as_ref()?;
        Some(self.filter_hidden(children, skip_hidden))
    }

    /// The sibling list `id` lives in. Top-level nodes are siblings of each other.
    fn siblings(&self, id: &NodeId, skip_hidden: bool) -> Option<Vec<NodeId>> {
        match &self.entry(id)?.parent {
            Some(parent) => self.visible_children(parent, skip_hidden),
            None => Some(self.root_ids(skip_hidden)),
        }
    }

    pub(crate) fn index_in_parent(&self, id: &NodeId, skip_hidden: bool) -> Option<usize> {
        self.siblings(id, skip_hidden)?
            .iter()
            .position(|sibling| sibling == id)
    }

    pub(crate) fn next_sibling(&self, id: &NodeId, skip_hidden: bool) -> Option<NodeId> {
        let siblings = self.siblings(id, skip_hidden)?;
        let index = siblings.iter().position(|sibling| sibling == id)?;
        siblings.get(index + 1).cloned()
    }

    pub(crate) fn previous_sibling(&self, id: &NodeId, skip_hidden: bool) -> Option<NodeId> {
        let siblings = self.siblings(id, skip_hidden)?;
        let index = siblings.iter().position(|sibling| sibling == id)?;
        index.checked_sub(1).and_then(|i| siblings.get(i).cloned())
    }

    pub(crate) fn first_child(&self, id: &NodeId, skip_hidden: bool) -> Option<NodeId> {
        self.visible_children(id, skip_hidden)?.first().cloned()
    }

    pub(crate) fn last_child(&self, id: &NodeId, skip_hidden: bool) -> Option<NodeId> {
        self.visible_children(id, skip_hidden)?.last().cloned()
    }

    /// The node after `id` in depth-first, expansion-aware order.
    pub(crate) fn find_next_node(&self, id: &NodeId, go_inside: bool, skip_hidden: bool) -> Option<NodeId> {
        let mut current = id.clone();
        let mut go_inside = go_inside;
        loop {
            if go_inside && self.state.is_expanded(&current) {
                if let Some(child) = self.first_child(&current, skip_hidden) {
                    return Some(child);
                }
            }
            if let Some(sibling) = self.next_sibling(&current, skip_hidden) {
                return Some(sibling);
            }
            // Climb without re-entering the ancestor.
            current = self.entry(&current)?.parent.clone()?;
            go_inside = false;
        }
    }

    /// The node before `id` in depth-first, expansion-aware order.
    pub(crate) fn find_previous_node(&self, id: &NodeId, skip_hidden: bool) -> Option<NodeId> {
        match self.previous_sibling(id, skip_hidden) {
            Some(sibling) => Some(self.last_open_descendant(&sibling, skip_hidden)),
            None => self.entry(id)?.parent.clone(),
        }
    }

    /// Follow last children down while nodes are expanded.
    pub(crate) fn last_open_descendant(&self, id: &NodeId, skip_hidden: bool) -> NodeId {
        let mut current = id.clone();
        while self.state.is_expanded(&current) {
            match self.last_child(&current, skip_hidden) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    /// True when `ancestor` is `id` or one of its parents.
    pub(crate) fn is_descendant_of(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        let mut current = Some(id.clone());
        while let Some(node) = current {
            if node == *ancestor {
                return true;
            }
            current = self.entry(&node).and_then(|entry| entry.parent.clone());
        }
        false
    }

    /// Depth below the top level; top-level nodes are level 0.
    pub(crate) fn level(&self, id: &NodeId) -> usize {
        let mut level = 0;
        let mut current = self.entry(id).and_then(|entry| entry.parent.clone());
        while let Some(parent) = current {
            level += 1;
            current = self.entry(&parent).and_then(|entry| entry.parent.clone());
        }
        level
    }

    /// Ids from the top-level ancestor down to `id`.
    pub(crate) fn path(&self, id: &NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        let mut path = vec![id.clone()];
        let mut current = self.entry(id).and_then(|entry| entry.parent.clone());
        while let Some(parent) = current {
            current = self.entry(&parent).and_then(|entry| entry.parent.clone());
            path.push(parent);
        }
        path.reverse();
        path
    }
}
