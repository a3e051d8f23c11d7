//! Tree handle and node arena.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use tokio::sync::broadcast;

use crate::error::TreeError;
use crate::field::TreeRecord;
use crate::id::NodeId;
use crate::options::TreeOptions;

use super::events::{EventBus, TreeEvent, TreeEventKind};
use super::loading::{LoadState, PendingLoad};
use super::node::TreeNode;
use super::shared::TreeStateSets;

/// Unique identifier for a Tree instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(usize);

impl TreeId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "__tree_{}", self.0)
    }
}

/// Arena slot of a single node.
pub(crate) struct NodeEntry<R> {
    pub(crate) data: R,
    /// `None` for top-level nodes.
    pub(crate) parent: Option<NodeId>,
    pub(crate) is_root: bool,
    /// `None` until children are loaded; `Some(vec![])` is a confirmed leaf.
    pub(crate) children: Option<Vec<NodeId>>,
    /// Position among siblings at construction time.
    pub(crate) index: usize,
    /// Rendering offset, owned by the rendering layer.
    pub(crate) position: u32,
    /// Height set by the rendering layer, overriding the configured one.
    pub(crate) height: Option<u16>,
    pub(crate) load: LoadState,
    pub(crate) pending: Option<PendingLoad>,
    /// Whether the auto-load reaction is subscribed.
    pub(crate) auto_load: bool,
}

/// Internal state for the Tree.
pub(crate) struct TreeInner<R: TreeRecord> {
    pub(crate) nodes: HashMap<NodeId, NodeEntry<R>>,
    /// Top-level nodes in order.
    pub(crate) roots: Vec<NodeId>,
    pub(crate) state: TreeStateSets,
    pub(crate) options: TreeOptions<R>,
    pub(crate) events: EventBus,
    /// Nodes whose auto-load condition needs re-evaluation.
    pub(crate) reactions: Vec<NodeId>,
}

impl<R: TreeRecord> TreeInner<R> {
    fn new(options: TreeOptions<R>) -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            state: TreeStateSets::default(),
            options,
            events: EventBus::new(),
            reactions: Vec::new(),
        }
    }

    pub(crate) fn entry(&self, id: &NodeId) -> Option<&NodeEntry<R>> {
        self.nodes.get(id)
    }

    /// True if the record declares children or loaded children exist.
    pub(crate) fn has_children(&self, id: &NodeId) -> bool {
        self.entry(id).is_some_and(|entry| {
            entry.data.has_children_flag(&self.options.fields)
                || entry.children.as_ref().is_some_and(|c| !c.is_empty())
        })
    }

    pub(crate) fn fire(&self, kind: TreeEventKind, id: &NodeId) {
        self.events.fire(kind, id);
    }

    /// Wrap `data` into a new node and materialize its subtree.
    pub(crate) fn build_node(&mut self, mut data: R, parent: Option<&NodeId>, index: usize) -> NodeId {
        let fields = &self.options.fields;
        let id = match data.id(fields) {
            Some(id) if self.nodes.contains_key(&id) => {
                let surrogate = NodeId::generate();
                log::warn!("duplicate node id '{}', using '{}' instead", id, surrogate);
                data.set_id(fields, surrogate.clone());
                surrogate
            }
            Some(id) => id,
            None => {
                let id = NodeId::generate();
                data.set_id(fields, id.clone());
                id
            }
        };
        let has_raw_children = data.children(fields).is_some();
        let starts_expanded = data.is_expanded_flag(fields);

        self.nodes.insert(
            id.clone(),
            NodeEntry {
                data,
                parent: parent.cloned(),
                is_root: parent.is_none(),
                children: None,
                index,
                position: 0,
                height: None,
                load: LoadState::NotLoaded,
                pending: None,
                auto_load: false,
            },
        );

        if has_raw_children {
            self.init_children(&id);
        }
        if starts_expanded && self.has_children(&id) {
            self.set_expanded(&id, true);
        }
        self.subscribe_auto_load(&id);
        id
    }

    /// Rebuild the children of `id` from its record.
    ///
    /// This is the only way raw child records become live nodes.
    pub(crate) fn init_children(&mut self, id: &NodeId) {
        let Some(entry) = self.nodes.get_mut(id) else {
            return;
        };
        let records = entry.data.children(&self.options.fields).unwrap_or_default();
        let previous = entry.children.take();

        let reloading = previous.is_some();
        for old in previous.into_iter().flatten() {
            self.forget(&old);
        }

        let children = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.build_node(record, Some(id), index))
            .collect();

        if let Some(entry) = self.nodes.get_mut(id) {
            entry.children = Some(children);
            entry.load = LoadState::Loaded;
        }

        if reloading {
            self.prune_state();
        }
    }

    /// Ids of `id` and all its materialized descendants, pre-order.
    pub(crate) fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.entry(&current) {
                if let Some(children) = &entry.children {
                    stack.extend(children.iter().rev().cloned());
                }
                out.push(current);
            }
        }
        out
    }

    /// Remove a subtree from the arena without touching the shared state.
    fn forget(&mut self, id: &NodeId) {
        for node in self.subtree(id) {
            self.nodes.remove(&node);
        }
    }

    /// Drop state memberships of ids that are no longer in the arena.
    fn prune_state(&mut self) {
        let nodes = &self.nodes;
        self.state.retain(|id| nodes.contains_key(id));
    }

    /// Dispose `id` and its subtree, children first.
    pub(crate) fn dispose(&mut self, id: &NodeId) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let parent = entry.parent.clone();

        for node in self.subtree(id).into_iter().rev() {
            self.nodes.remove(&node);
            self.state.forget(&node);
        }

        match parent {
            Some(parent) => {
                if let Some(children) = self
                    .nodes
                    .get_mut(&parent)
                    .and_then(|entry| entry.children.as_mut())
                {
                    children.retain(|child| child != id);
                }
            }
            None => self.roots.retain(|root| root != id),
        }
        log::debug!("disposed node '{}'", id);
        true
    }

    /// Replace all top-level nodes.
    ///
    /// State memberships survive for ids that reappear in the new records.
    pub(crate) fn set_roots(&mut self, records: Vec<R>) {
        for root in std::mem::take(&mut self.roots) {
            self.forget(&root);
        }
        self.roots = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| self.build_node(record, None, index))
            .collect();
        self.prune_state();
        log::debug!("tree rebuilt with {} nodes", self.nodes.len());
    }

    /// Re-key a node.
    pub(crate) fn rename(&mut self, from: &NodeId, to: NodeId) -> Result<(), TreeError> {
        if from == &to {
            return Ok(());
        }
        if self.nodes.contains_key(&to) {
            return Err(TreeError::DuplicateId(to));
        }
        let mut entry = self
            .nodes
            .remove(from)
            .ok_or_else(|| TreeError::NodeNotFound(from.clone()))?;
        entry.data.set_id(&self.options.fields, to.clone());
        // An in-flight load still reports under the old id and is dropped.
        if entry.pending.take().is_some() {
            log::debug!("abandoning in-flight load of '{}' on rename", from);
            entry.load = if entry.children.is_some() {
                LoadState::Loaded
            } else {
                LoadState::NotLoaded
            };
        }

        let siblings = match &entry.parent {
            Some(parent) => self
                .nodes
                .get_mut(parent)
                .and_then(|parent| parent.children.as_mut()),
            None => Some(&mut self.roots),
        };
        if let Some(siblings) = siblings {
            for sibling in siblings.iter_mut() {
                if *sibling == *from {
                    *sibling = to.clone();
                }
            }
        }
        for child in entry.children.iter().flatten() {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = Some(to.clone());
            }
        }
        self.nodes.insert(to.clone(), entry);
        self.state.rename(from, &to);
        for pending in &mut self.reactions {
            if *pending == *from {
                *pending = to.clone();
            }
        }
        self.reactions.push(to.clone());
        log::debug!("node '{}' renamed to '{}'", from, to);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Shared state mutators
    // -------------------------------------------------------------------------

    pub(crate) fn set_expanded(&mut self, id: &NodeId, value: bool) -> bool {
        if !self.state.set_expanded(id, value) {
            return false;
        }
        log::debug!("node '{}' {}", id, if value { "expanded" } else { "collapsed" });
        let kind = if value {
            TreeEventKind::Expand
        } else {
            TreeEventKind::Collapse
        };
        self.fire(kind, id);
        self.reactions.push(id.clone());
        true
    }

    pub(crate) fn set_active(&mut self, id: &NodeId, value: bool, multi: bool) {
        let was_active = self.state.is_active(id);
        let removed = self.state.set_active(id, value, multi);
        for node in &removed {
            self.fire(TreeEventKind::Deactivate, node);
        }
        if value && !was_active {
            log::debug!("node '{}' activated", id);
            self.fire(TreeEventKind::Activate, id);
        }
    }

    /// Write the selected set directly, bypassing tri-state fan-out.
    pub(crate) fn set_selected_node(&mut self, id: &NodeId, value: bool) {
        if self.state.set_selected(id, value) {
            let kind = if value {
                TreeEventKind::Select
            } else {
                TreeEventKind::Deselect
            };
            self.fire(kind, id);
        }
    }

    pub(crate) fn set_hidden(&mut self, id: &NodeId, value: bool) {
        self.state.set_hidden(id, value);
    }

    /// Move the focused slot to `id`. A previous holder is blurred first.
    pub(crate) fn focus(&mut self, id: &NodeId) {
        let previous = self.state.set_focused(Some(id.clone()));
        if let Some(previous) = previous.filter(|previous| previous != id) {
            self.fire(TreeEventKind::Blur, &previous);
        }
        log::debug!("node '{}' focused", id);
        self.fire(TreeEventKind::Focus, id);
    }

    pub(crate) fn blur(&mut self) {
        if let Some(previous) = self.state.set_focused(None) {
            self.fire(TreeEventKind::Blur, &previous);
        }
    }
}

/// A tree of nodes with shared expansion, selection, activation, focus and
/// visibility state.
///
/// `Tree<R>` is a cheap-clone handle; clones share the same nodes and state.
///
/// # Example
///
/// ```ignore
/// let tree = Tree::with_records(
///     vec![json!({ "id": "src", "children": [{ "id": "main.rs" }] })],
///     TreeOptions::new(),
/// );
/// let src = tree.node("src").unwrap();
/// src.expand();
/// assert_eq!(src.find_next_node(true, false).unwrap().id().as_str(), "main.rs");
/// ```
pub struct Tree<R: TreeRecord> {
    id: TreeId,
    inner: Arc<RwLock<TreeInner<R>>>,
    /// Set on every mutation, cleared by the renderer.
    dirty: Arc<AtomicBool>,
}

impl<R: TreeRecord> Tree<R> {
    /// Create an empty tree.
    pub fn new(options: TreeOptions<R>) -> Self {
        Self {
            id: TreeId::new(),
            inner: Arc::new(RwLock::new(TreeInner::new(options))),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a tree with initial top-level records.
    pub fn with_records(records: Vec<R>, options: TreeOptions<R>) -> Self {
        let tree = Self::new(options);
        tree.set_records(records);
        tree
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&TreeInner<R>) -> T) -> Option<T> {
        self.inner.read().ok().map(|guard| f(&guard))
    }

    /// Mutate under the write lock, then run the reactions the mutation
    /// queued. The lock is released before any reaction runs.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut TreeInner<R>) -> T) -> Option<T> {
        let result = self.inner.write().ok().map(|mut guard| f(&mut guard));
        if result.is_some() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        self.flush_reactions();
        result
    }

    /// Raw write access. Queued reactions are left for the next `write`.
    pub(crate) fn inner_write(&self) -> Option<RwLockWriteGuard<'_, TreeInner<R>>> {
        self.inner.write().ok()
    }

    /// Launch every load the pending reactions call for.
    fn flush_reactions(&self) {
        let due = match self.inner.write() {
            Ok(mut guard) => guard.take_due_loads(),
            Err(_) => return,
        };
        for id in due {
            self.launch_load(&id);
        }
    }

    pub(crate) fn handle(&self, id: NodeId) -> TreeNode<R> {
        TreeNode::new(self.clone(), id)
    }

    fn handles(&self, ids: Vec<NodeId>) -> Vec<TreeNode<R>> {
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    // -------------------------------------------------------------------------
    // Node access
    // -------------------------------------------------------------------------

    /// Replace every top-level record and rebuild the node graph.
    pub fn set_records(&self, records: Vec<R>) {
        self.write(|inner| inner.set_roots(records));
    }

    /// Top-level nodes in order.
    pub fn roots(&self) -> Vec<TreeNode<R>> {
        let ids = self.read(|inner| inner.roots.clone()).unwrap_or_default();
        self.handles(ids)
    }

    /// Look up a node by id.
    pub fn node(&self, id: impl Into<NodeId>) -> Option<TreeNode<R>> {
        let id = id.into();
        self.contains(&id).then(|| self.handle(id))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.read(|inner| inner.nodes.contains_key(id))
            .unwrap_or(false)
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.read(|inner| inner.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_root(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner| inner.root_ids(skip_hidden).first().cloned())??;
        Some(self.handle(id))
    }

    pub fn last_root(&self, skip_hidden: bool) -> Option<TreeNode<R>> {
        let id = self.read(|inner| inner.root_ids(skip_hidden).last().cloned())??;
        Some(self.handle(id))
    }

    // -------------------------------------------------------------------------
    // Shared state
    // -------------------------------------------------------------------------

    pub fn focused_node(&self) -> Option<TreeNode<R>> {
        let id = self.read(|inner| inner.state.focused().cloned())??;
        Some(self.handle(id))
    }

    /// Active nodes in activation order.
    pub fn active_nodes(&self) -> Vec<TreeNode<R>> {
        let ids = self
            .read(|inner| inner.state.active.clone())
            .unwrap_or_default();
        self.handles(ids)
    }

    pub fn selected_ids(&self) -> HashSet<NodeId> {
        self.read(|inner| inner.state.selected.clone())
            .unwrap_or_default()
    }

    pub fn expanded_ids(&self) -> HashSet<NodeId> {
        self.read(|inner| inner.state.expanded.clone())
            .unwrap_or_default()
    }

    pub fn hidden_ids(&self) -> HashSet<NodeId> {
        self.read(|inner| inner.state.hidden.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the whole shared state.
    pub fn state(&self) -> TreeStateSets {
        self.read(|inner| inner.state.clone()).unwrap_or_default()
    }

    /// Whether the tree as a whole has input focus.
    pub fn has_focus(&self) -> bool {
        self.read(|inner| inner.state.has_focus).unwrap_or(false)
    }

    pub fn set_focus(&self, value: bool) {
        self.write(|inner| inner.state.has_focus = value);
    }

    /// Subscribe to tree events.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        match self.inner.read() {
            Ok(guard) => guard.events.subscribe(),
            Err(poisoned) => poisoned.into_inner().events.subscribe(),
        }
    }

    // -------------------------------------------------------------------------
    // Bulk expansion
    // -------------------------------------------------------------------------

    /// Expand every node, loading lazy children on the way.
    pub async fn expand_all(&self) {
        for root in self.roots() {
            root.expand_all().await;
        }
    }

    pub async fn collapse_all(&self) {
        for root in self.roots() {
            root.collapse_all().await;
        }
    }

    // -------------------------------------------------------------------------
    // Focus navigation
    // -------------------------------------------------------------------------

    /// Focus the next visible node, or the first root when nothing is focused.
    pub fn focus_next_node(&self) -> Option<TreeNode<R>> {
        let next = match self.focused_node() {
            Some(current) => current.find_next_node(true, true),
            None => self.first_root(true),
        }?;
        next.focus(true);
        Some(next)
    }

    /// Focus the previous visible node, or the last root when nothing is focused.
    pub fn focus_previous_node(&self) -> Option<TreeNode<R>> {
        let previous = match self.focused_node() {
            Some(current) => current.find_previous_node(true),
            None => self.last_root(true),
        }?;
        previous.focus(true);
        Some(previous)
    }

    /// Expand the focused node, or move into its first child when already open.
    pub fn focus_drill_down(&self) {
        let Some(current) = self.focused_node() else {
            return;
        };
        if current.is_collapsed() && current.has_children() {
            current.expand();
        } else if let Some(child) = current.first_child(true) {
            child.focus(true);
        }
    }

    /// Collapse the focused node, or move to its parent when already closed.
    pub fn focus_drill_up(&self) {
        let Some(current) = self.focused_node() else {
            return;
        };
        if current.is_expanded() {
            current.collapse();
        } else if let Some(parent) = current.real_parent() {
            parent.focus(true);
        }
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Hide every node that does not match and has no matching descendant.
    ///
    /// With `auto_show`, ancestors of visible nodes are expanded.
    pub fn filter_nodes(&self, predicate: impl Fn(&TreeNode<R>) -> bool, auto_show: bool) {
        let ids = self
            .read(|inner| {
                inner
                    .roots
                    .iter()
                    .flat_map(|root| inner.subtree(root))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        // Predicates see the tree, so they must run without the lock held.
        let matches: HashSet<NodeId> = ids
            .into_iter()
            .filter(|id| predicate(&self.handle(id.clone())))
            .collect();

        self.write(|inner| {
            let mut hidden = HashSet::new();
            let mut shown = Vec::new();
            for root in inner.roots.clone() {
                inner.filter_subtree(&root, &matches, &mut hidden, &mut shown);
            }
            inner.state.hidden = hidden;
            if auto_show {
                for id in shown {
                    inner.expand_ancestors(&id);
                }
            }
            if let Some(first) = inner.roots.first() {
                inner.fire(TreeEventKind::ChangeFilter, first);
            }
        });
    }

    /// Show every node again.
    pub fn clear_filter(&self) {
        self.write(|inner| {
            inner.state.hidden.clear();
            if let Some(first) = inner.roots.first() {
                inner.fire(TreeEventKind::ChangeFilter, first);
            }
        });
    }

    // -------------------------------------------------------------------------
    // Dirty tracking
    // -------------------------------------------------------------------------

    /// Check if the tree has changed since the last `clear_dirty`.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    pub(crate) fn same_tree(&self, other: &Tree<R>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R: TreeRecord> TreeInner<R> {
    /// Returns whether `id` stays visible.
    fn filter_subtree(
        &self,
        id: &NodeId,
        matches: &HashSet<NodeId>,
        hidden: &mut HashSet<NodeId>,
        shown: &mut Vec<NodeId>,
    ) -> bool {
        let mut visible = matches.contains(id);
        if let Some(children) = self.entry(id).and_then(|entry| entry.children.as_ref()) {
            for child in children {
                if self.filter_subtree(child, matches, hidden, shown) {
                    visible = true;
                }
            }
        }
        if visible {
            shown.push(id.clone());
        } else {
            hidden.insert(id.clone());
        }
        visible
    }

    /// Expand every real ancestor of `id`.
    pub(crate) fn expand_ancestors(&mut self, id: &NodeId) {
        let mut current = self.entry(id).and_then(|entry| entry.parent.clone());
        while let Some(parent) = current {
            if self.has_children(&parent) {
                self.set_expanded(&parent, true);
            }
            current = self.entry(&parent).and_then(|entry| entry.parent.clone());
        }
    }
}

impl<R: TreeRecord> Clone for Tree<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
            dirty: Arc::clone(&self.dirty),
        }
    }
}

impl<R: TreeRecord> Default for Tree<R> {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl<R: TreeRecord> fmt::Debug for Tree<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}
