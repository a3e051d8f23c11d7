//! Node handle.

use std::fmt;
use std::future::Future;

use serde_json::Value;

use crate::error::TreeError;
use crate::field::{Field, FieldValue, TreeRecord};
use crate::id::NodeId;
use crate::options::DropTarget;

use super::actions::{MouseAction, PointerEvent};
use super::loading::{LoadState, walk};
use super::state::{Tree, TreeInner};

/// A handle to one node of a [`Tree`].
///
/// Handles are cheap to clone and compare equal when they point at the same
/// node of the same tree. Every state getter is recomputed from the tree on
/// each call. Once the node is disposed, getters return neutral values
/// (`None`, `false`, empty) and mutators do nothing.
pub struct TreeNode<R: TreeRecord> {
    tree: Tree<R>,
    id: NodeId,
}

impl<R: TreeRecord> TreeNode<R> {
    pub(crate) fn new(tree: Tree<R>, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn read<T: Default>(&self, f: impl FnOnce(&TreeInner<R>, &NodeId) -> T) -> T {
        self.tree.read(|inner| f(inner, &self.id)).unwrap_or_default()
    }

    fn write<T: Default>(&self, f: impl FnOnce(&mut TreeInner<R>, &NodeId) -> T) -> T {
        self.tree.write(|inner| f(inner, &self.id)).unwrap_or_default()
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<TreeNode<R>> {
        id.map(|id| self.tree.handle(id))
    }

    fn wrap_all(&self, ids: Vec<NodeId>) -> Vec<TreeNode<R>> {
        ids.into_iter().map(|id| self.tree.handle(id)).collect()
    }

    // -------------------------------------------------------------------------
    // Identity and data
    // -------------------------------------------------------------------------

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn tree(&self) -> &Tree<R> {
        &self.tree
    }

    /// A copy of the wrapped record.
    pub fn data(&self) -> Option<R> {
        self.read(|inner, id| inner.entry(id).map(|entry| entry.data.clone()))
    }

    pub fn display_field(&self) -> Option<String> {
        self.read(|inner, id| {
            inner
                .entry(id)
                .and_then(|entry| entry.data.display(&inner.options.fields))
        })
    }

    /// Read a conceptual field through the tree's field mapping.
    pub fn get_field(&self, field: Field) -> Option<FieldValue<R>> {
        self.read(|inner, id| {
            inner
                .entry(id)
                .and_then(|entry| entry.data.get_field(&inner.options.fields, field))
        })
    }

    /// Write a conceptual field through the tree's field mapping.
    ///
    /// Writing [`Field::Id`] re-keys the node like [`TreeNode::set_id`].
    /// Writing [`Field::Children`] stores records only; they become nodes on
    /// the next load.
    pub fn set_field(&mut self, field: Field, value: FieldValue<R>) -> Result<(), TreeError> {
        if let (Field::Id, FieldValue::Id(new_id)) = (field, &value) {
            return self.set_id(new_id.clone());
        }
        let found = self.write(|inner, id| {
            let fields = &inner.options.fields;
            match inner.nodes.get_mut(id) {
                Some(entry) => {
                    entry.data.set_field(fields, field, value);
                    true
                }
                None => false,
            }
        });
        if found {
            Ok(())
        } else {
            Err(TreeError::NodeNotFound(self.id.clone()))
        }
    }

    /// Re-key this node. This handle follows the new id; other handles to
    /// the old id read as disposed.
    pub fn set_id(&mut self, new_id: impl Into<NodeId>) -> Result<(), TreeError> {
        let new_id = new_id.into();
        self.tree
            .write(|inner| inner.rename(&self.id, new_id.clone()))
            .unwrap_or_else(|| Err(TreeError::NodeNotFound(self.id.clone())))?;
        self.id = new_id;
        Ok(())
    }

    /// Deprecated direct element access. Always fails.
    #[deprecated(note = "use the rendering layer's own element lookup")]
    pub fn element_ref(&self) -> Result<(), TreeError> {
        Err(TreeError::Unsupported {
            feature: "element_ref",
            alternative: "the rendering layer's element lookup",
        })
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// The parent node. `None` for top-level nodes.
    pub fn parent(&self) -> Option<TreeNode<R>> {
        let parent = self.read(|inner, id| inner.entry(id).and_then(|entry| entry.parent.clone()));
        self.wrap(parent)
    }

    /// The parent unless this is a top-level node.
    pub fn real_parent(&self) -> Option<TreeNode<R>> {
        if self.is_root() {
            return None;
        }
        self.parent()
    }

    /// Loaded children. `None` until loaded, empty for a confirmed leaf.
    pub fn children(&self) -> Option<Vec<TreeNode<R>>> {
        let children = self.read(|inner, id| inner.entry(id).and_then(|entry| entry.children.clone()));
        children.map(|ids| self.wrap_all(ids))
    }

    /// Loaded children, without hidden ones when `skip_hidden` is set.
    pub fn visible_children(&self, skip_hidden: bool) -> Vec<TreeNode<R>> {
        let ids = self.read(|inner, id| inner.visible_children(id, skip_hidden).unwrap_or_default());
        self.wrap_all(ids)
    }

    /// Whether this is a top-level node.
    pub fn is_root(&self) -> bool {
        self.read(|inner, id| inner.entry(id).is_some_and(|entry| entry.is_root))
    }

    pub fn has_children(&self) -> bool {
        self.read(|inner, id| inner.has_children(id))
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children()
    }

    /// Position among siblings when the node was built.
    pub fn index(&self) -> usize {
        self.read(|inner, id| inner.entry(id).map(|entry| entry.index).unwrap_or_default())
    }

    pub fn level(&self) -> usize {
        self.read(|inner, id| inner.level(id))
    }

    /// Ids from the top-level ancestor down to this node.
    pub fn path(&self) -> Vec<NodeId> {
        self.read(|inner, id| inner.path(id))
    }

    pub fn load_state(&self) -> LoadState {
        self.read(|inner, id| inner.entry(id).map(|entry| entry.load).unwrap_or_default())
    }

    pub fn is_disposed(&self) -> bool {
        !self.tree.contains(&self.id)
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    pub fn position(&self) -> u32 {
        self.read(|inner, id| inner.entry(id).map(|entry| entry.position).unwrap_or_default())
    }

    pub fn set_position(&self, position: u32) {
        self.write(|inner, id| {
            if let Some(entry) = inner.nodes.get_mut(id) {
                entry.position = position;
            }
        });
    }

    /// Rendered height. A per-record callback runs outside the tree lock.
    pub fn height(&self) -> u16 {
        let lookup = self.read(|inner, id| {
            inner
                .entry(id)
                .map(|entry| (entry.height, entry.data.clone(), inner.options.node_height.clone()))
        });
        match lookup {
            Some((Some(height), _, _)) => height,
            Some((None, record, node_height)) => node_height.height(&record),
            None => 0,
        }
    }

    pub fn set_height(&self, height: u16) {
        self.write(|inner, id| {
            if let Some(entry) = inner.nodes.get_mut(id) {
                entry.height = Some(height);
            }
        });
    }

    /// Indentation of this node: level padding times level.
    pub fn node_padding(&self) -> u32 {
        self.read(|inner, id| u32::from(inner.options.level_padding) * inner.level(id) as u32)
    }

    /// Class string from the configured class function, or empty.
    pub fn class(&self) -> String {
        let class_fn = self.read(|inner, _| inner.options.node_class.clone());
        class_fn.map(|f| f(self)).unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn find_next_sibling(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.next_sibling(id, skip_hidden));
        self.wrap(id)
    }

    pub fn find_previous_sibling(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.previous_sibling(id, skip_hidden));
        self.wrap(id)
    }

    /// The next node in depth-first, expansion-aware order.
    ///
    /// With `go_inside` unset, this node's own children are skipped.
    pub fn find_next_node(&self, go_inside: bool, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.find_next_node(id, go_inside, skip_hidden));
        self.wrap(id)
    }

    /// The previous node in depth-first, expansion-aware order.
    pub fn find_previous_node(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.find_previous_node(id, skip_hidden));
        self.wrap(id)
    }

    pub fn first_child(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.first_child(id, skip_hidden));
        self.wrap(id)
    }

    pub fn last_child(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner, id| inner.last_child(id, skip_hidden));
        self.wrap(id)
    }

    /// Deepest last child reachable through expanded nodes, or self.
    pub fn last_open_descendant(&self, skip_hidden: bool) -> TreeNode<R> {
        let id = self
            .tree
            .read(|inner| inner.last_open_descendant(&self.id, skip_hidden))
            .unwrap_or_else(|| self.id.clone());
        self.tree.handle(id)
    }

    /// Index among the (filtered) siblings. `None` when detached.
    pub fn index_in_parent(&self, skip_hidden: bool) -> Option<usize> {
        self.read(|inner, id| inner.index_in_parent(id, skip_hidden))
    }

    /// True when `node` is this node or one of its ancestors.
    pub fn is_descendant_of(&self, node: &TreeNode<R>) -> bool {
        self.tree.same_tree(&node.tree) && self.read(|inner, id| inner.is_descendant_of(id, &node.id))
    }

    // -------------------------------------------------------------------------
    // Expansion
    // -------------------------------------------------------------------------

    pub fn is_expanded(&self) -> bool {
        self.read(|inner, id| inner.state.is_expanded(id))
    }

    pub fn is_collapsed(&self) -> bool {
        !self.is_expanded()
    }

    /// Expand or collapse. Does nothing for nodes without children.
    pub fn set_is_expanded(&self, value: bool) {
        self.write(|inner, id| {
            if inner.has_children(id) {
                inner.set_expanded(id, value);
            }
        });
    }

    pub fn expand(&self) {
        self.set_is_expanded(true);
    }

    pub fn collapse(&self) {
        self.set_is_expanded(false);
    }

    pub fn toggle_expanded(&self) {
        self.set_is_expanded(!self.is_expanded());
    }

    /// Expand every ancestor so this node becomes reachable.
    pub fn ensure_visible(&self) {
        self.write(|inner, id| inner.expand_ancestors(id));
    }

    // -------------------------------------------------------------------------
    // Activation and focus
    // -------------------------------------------------------------------------

    pub fn is_active(&self) -> bool {
        self.read(|inner, id| inner.state.is_active(id))
    }

    /// Update activation. Activating also focuses the node.
    pub fn set_is_active(&self, value: bool, multi: bool) {
        let scroll = self.write(|inner, id| {
            if !inner.nodes.contains_key(id) {
                return false;
            }
            inner.set_active(id, value, multi);
            inner.options.scroll_on_activate
        });
        if value && !self.is_disposed() {
            self.focus(scroll);
        }
    }

    pub fn toggle_activated(&self, multi: bool) {
        self.set_is_active(!self.is_active(), multi);
    }

    /// Activate, reveal and scroll to this node.
    pub fn set_active_and_visible(&self, multi: bool) {
        self.set_is_active(true, multi);
        self.ensure_visible();
        self.scroll_into_view(false);
    }

    pub fn is_focused(&self) -> bool {
        self.read(|inner, id| inner.state.is_focused(id))
    }

    /// Take the tree's single focused slot.
    pub fn focus(&self, scroll: bool) {
        let focused = self.write(|inner, id| {
            if !inner.nodes.contains_key(id) {
                return false;
            }
            inner.focus(id);
            true
        });
        if focused && scroll {
            self.scroll_into_view(false);
        }
    }

    /// Clear the tree's focused slot.
    pub fn blur(&self) {
        self.write(|inner, _| inner.blur());
    }

    /// Ask the viewport to bring this node on screen.
    pub fn scroll_into_view(&self, force: bool) {
        let viewport = self.read(|inner, _| inner.options.viewport.clone());
        if let Some(viewport) = viewport {
            viewport.scroll_into_view(self, force);
        }
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    pub fn is_hidden(&self) -> bool {
        self.read(|inner, id| inner.state.is_hidden(id))
    }

    pub fn set_is_hidden(&self, value: bool) {
        self.write(|inner, id| {
            if inner.nodes.contains_key(id) {
                inner.set_hidden(id, value);
            }
        });
    }

    pub fn hide(&self) {
        self.set_is_hidden(true);
    }

    pub fn show(&self) {
        self.set_is_hidden(false);
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Whether this node stores its own selection.
    pub fn is_selectable(&self) -> bool {
        self.read(|inner, id| inner.is_selectable(id))
    }

    pub fn is_selected(&self) -> bool {
        self.read(|inner, id| inner.is_selected(id))
    }

    pub fn is_all_selected(&self) -> bool {
        self.read(|inner, id| inner.is_all_selected(id))
    }

    pub fn is_partially_selected(&self) -> bool {
        self.read(|inner, id| inner.is_partially_selected(id))
    }

    pub fn set_is_selected(&self, value: bool) {
        self.write(|inner, id| {
            if inner.nodes.contains_key(id) {
                inner.set_selected(id, value);
            }
        });
    }

    pub fn toggle_selected(&self) {
        self.set_is_selected(!self.is_selected());
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Fetch and materialize children from the configured source.
    ///
    /// Resolves immediately when no source is configured. Joins a load that
    /// is already in flight instead of starting another.
    pub async fn load_node_children(&self) -> Result<(), TreeError> {
        match self.tree.begin_load(&self.id) {
            Some(load) => load.await,
            None => Ok(()),
        }
    }

    /// Subscribe the auto-load reaction and evaluate it right away.
    ///
    /// Every node is subscribed when built; this re-subscribes after the
    /// subscription was dropped.
    pub fn auto_load_children(&self) {
        self.write(|inner, id| inner.subscribe_auto_load(id));
    }

    /// Run `f` on this node, then on every descendant in order.
    ///
    /// Each call is awaited before the children of its node are read.
    pub async fn do_for_all<F, Fut>(&self, f: F)
    where
        F: Fn(TreeNode<R>) -> Fut,
        Fut: Future<Output = ()>,
    {
        walk(self.clone(), f).await;
    }

    /// Expand this node and its whole subtree, loading lazy children.
    pub async fn expand_all(&self) {
        self.do_for_all(|node| async move {
            node.expand();
            if node.has_children() && node.children().is_none() {
                if let Err(err) = node.load_node_children().await {
                    log::warn!("expand_all: {}", err);
                }
            }
        })
        .await;
    }

    pub async fn collapse_all(&self) {
        self.do_for_all(|node| async move { node.collapse() }).await;
    }

    /// Remove this node and its subtree from the tree.
    ///
    /// Shared state no longer mentions any of the removed ids and their
    /// auto-load subscriptions are dropped.
    pub fn dispose(&self) {
        self.write(|inner, id| inner.dispose(id));
    }

    // -------------------------------------------------------------------------
    // Pointer and drag-and-drop
    // -------------------------------------------------------------------------

    /// Dispatch a mouse action through the tree's action mapping.
    ///
    /// The tree always takes input focus first; unmapped actions do nothing.
    pub fn mouse_action(&self, action: MouseAction, event: &PointerEvent, data: Option<&Value>) {
        self.tree.set_focus(true);
        let handler = self.read(|inner, _| inner.options.action_mapping.get(action).cloned());
        match handler {
            Some(handler) => handler(&self.tree, self, event, data),
            None => log::trace!("no handler for {:?} on '{}'", action, self.id),
        }
    }

    /// Whether this node may be dragged. Off unless a predicate allows it.
    pub fn allow_drag(&self) -> bool {
        let predicate = self.read(|inner, _| inner.options.allow_drag.clone());
        predicate.is_some_and(|allow| allow(self))
    }

    /// Whether `dragged` may be dropped onto this node.
    ///
    /// Dropping a node into its own subtree is always refused.
    pub fn allow_drop(&self, dragged: &TreeNode<R>) -> bool {
        if self.is_descendant_of(dragged) {
            return false;
        }
        let target = DropTarget {
            parent: self.id.clone(),
            index: 0,
            drop_on_node: true,
        };
        let predicate = self.read(|inner, _| inner.options.allow_drop.clone());
        predicate.is_none_or(|allow| allow(dragged, &target))
    }

    pub fn allow_dragover_styling(&self) -> bool {
        self.read(|inner, _| inner.options.allow_dragover_styling)
    }
}

impl<R: TreeRecord> Clone for TreeNode<R> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            id: self.id.clone(),
        }
    }
}

impl<R: TreeRecord> PartialEq for TreeNode<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.tree.same_tree(&other.tree)
    }
}

impl<R: TreeRecord> Eq for TreeNode<R> {}

impl<R: TreeRecord> fmt::Debug for TreeNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("tree", &self.tree.id())
            .field("id", &self.id)
            .finish()
    }
}
