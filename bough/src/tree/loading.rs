//! Lazy child loading.
//!
//! Every node subscribes an auto-load reaction when it is built. The
//! reaction is re-evaluated whenever the node's expansion changes and
//! launches a detached load when the node is expanded, declares children,
//! and has none loaded yet.
//!
//! Loads are single-flight: while one is in flight, every caller (detached
//! reaction or explicit `load_node_children`) awaits the same shared future.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;

use crate::error::TreeError;
use crate::field::TreeRecord;
use crate::id::NodeId;

use super::events::TreeEventKind;
use super::node::TreeNode;
use super::state::{Tree, TreeInner};

/// Loading stage of a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Children may exist but have not been loaded.
    #[default]
    NotLoaded,
    /// A fetch is in flight.
    Loading,
    /// Children are materialized (possibly empty).
    Loaded,
}

/// An in-flight load, shared by everyone waiting on it.
pub(crate) type PendingLoad = Shared<BoxFuture<'static, Result<(), TreeError>>>;

/// Where lazily loaded child records come from.
///
/// Closures returning a boxed future implement this directly:
///
/// ```ignore
/// let options = TreeOptions::new().child_source(|node: TreeNode<Value>| {
///     let id = node.id().clone();
///     async move { api.list_children(&id).await.map_err(|e| TreeError::load(id, e.to_string())) }
///         .boxed()
/// });
/// ```
pub trait ChildSource<R: TreeRecord>: Send + Sync {
    /// Fetch the child records of `node`.
    ///
    /// Called without any tree lock held, so it may freely read the tree.
    fn children(&self, node: TreeNode<R>) -> BoxFuture<'static, Result<Vec<R>, TreeError>>;
}

impl<R, F> ChildSource<R> for F
where
    R: TreeRecord,
    F: Fn(TreeNode<R>) -> BoxFuture<'static, Result<Vec<R>, TreeError>> + Send + Sync,
{
    fn children(&self, node: TreeNode<R>) -> BoxFuture<'static, Result<Vec<R>, TreeError>> {
        self(node)
    }
}

impl<R: TreeRecord> TreeInner<R> {
    /// Subscribe the auto-load reaction of `id` and evaluate it right away.
    pub(crate) fn subscribe_auto_load(&mut self, id: &NodeId) {
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.auto_load = true;
            self.reactions.push(id.clone());
        }
    }

    /// Whether the auto-load reaction of `id` should start a load now.
    fn wants_load(&self, id: &NodeId) -> bool {
        self.entry(id).is_some_and(|entry| {
            entry.auto_load
                && entry.children.is_none()
                && entry.pending.is_none()
                && self.state.is_expanded(id)
                && self.has_children(id)
        })
    }

    /// Drain queued reactions, returning the nodes that need a load.
    pub(crate) fn take_due_loads(&mut self) -> Vec<NodeId> {
        let mut due: Vec<NodeId> = Vec::new();
        for id in std::mem::take(&mut self.reactions) {
            if !due.contains(&id) && self.wants_load(&id) {
                due.push(id);
            }
        }
        due
    }

    /// Store loaded records and materialize them.
    ///
    /// Order: records, child nodes, selection, auto-expansion, event.
    pub(crate) fn complete_load(
        &mut self,
        id: &NodeId,
        result: Result<Vec<R>, TreeError>,
    ) -> Result<(), TreeError> {
        let Some(entry) = self.nodes.get_mut(id) else {
            log::warn!("load of '{}' finished after the node was disposed or renamed", id);
            return Ok(());
        };
        entry.pending = None;

        let records = match result {
            Ok(records) => records,
            Err(err) => {
                entry.load = if entry.children.is_some() {
                    LoadState::Loaded
                } else {
                    LoadState::NotLoaded
                };
                log::debug!("load of '{}' failed: {}", id, err);
                return Err(err);
            }
        };

        let count = records.len();
        entry.data.set_children(&self.options.fields, records);
        self.init_children(id);

        // A selection made before the children existed moves down onto them.
        if self.options.use_tri_state && self.state.is_selected(id) && !self.is_selectable(id) {
            self.state.set_selected(id, false);
            self.set_selected(id, true);
        }

        let children = self
            .entry(id)
            .and_then(|entry| entry.children.clone())
            .unwrap_or_default();
        for child in &children {
            let flagged = self
                .entry(child)
                .is_some_and(|entry| entry.data.is_expanded_flag(&self.options.fields));
            if flagged && self.has_children(child) {
                self.set_expanded(child, true);
            }
        }

        log::debug!("loaded {} children of '{}'", count, id);
        self.fire(TreeEventKind::LoadNodeChildren, id);
        Ok(())
    }
}

impl<R: TreeRecord> Tree<R> {
    /// Return the in-flight load of `id`, starting one if none is pending.
    ///
    /// `None` when the node is gone or no child source is configured.
    pub(crate) fn begin_load(&self, id: &NodeId) -> Option<PendingLoad> {
        let (source, pending) = self.read(|inner| {
            inner
                .entry(id)
                .map(|entry| (inner.options.child_source.clone(), entry.pending.clone()))
        })??;
        if let Some(pending) = pending {
            log::trace!("joining in-flight load of '{}'", id);
            return Some(pending);
        }
        let source = source?;

        log::debug!("loading children of '{}'", id);
        let fetch = source.children(self.handle(id.clone()));
        let tree = self.clone();
        let node = id.clone();
        let load = async move {
            let result = fetch.await;
            tree.finish_load(&node, result)
        }
        .boxed()
        .shared();

        let mut guard = self.inner_write()?;
        let entry = guard.nodes.get_mut(id)?;
        if let Some(pending) = &entry.pending {
            // Someone else started a load while the source was being called.
            return Some(pending.clone());
        }
        entry.pending = Some(load.clone());
        entry.load = LoadState::Loading;
        Some(load)
    }

    fn finish_load(&self, id: &NodeId, result: Result<Vec<R>, TreeError>) -> Result<(), TreeError> {
        self.write(|inner| inner.complete_load(id, result))
            .unwrap_or(Ok(()))
    }

    /// Start a detached load for `id` on the current runtime.
    pub(crate) fn launch_load(&self, id: &NodeId) {
        let Some(load) = self.begin_load(id) else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                let id = id.clone();
                handle.spawn(async move {
                    if let Err(err) = load.await {
                        log::error!("background load of '{}' failed: {}", id, err);
                    }
                });
            }
            Err(_) => {
                log::warn!("no async runtime, children of '{}' were not loaded", id);
                if let Some(mut guard) = self.inner_write() {
                    if let Some(entry) = guard.nodes.get_mut(id) {
                        entry.pending = None;
                        entry.load = LoadState::NotLoaded;
                    }
                }
            }
        }
    }
}

/// Run `f` on `root` and then on every descendant, pre-order, one at a time.
///
/// Children are read after `f` finishes for their parent, so work that
/// loads children (like expanding) extends the walk.
pub(crate) async fn walk<R, F, Fut>(root: TreeNode<R>, f: F)
where
    R: TreeRecord,
    F: Fn(TreeNode<R>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        f(node.clone()).await;
        if let Some(children) = node.children() {
            stack.extend(children.into_iter().rev());
        }
    }
}
