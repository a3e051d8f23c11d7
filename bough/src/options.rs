//! Tree configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::field::{FieldMapping, TreeRecord};
use crate::id::NodeId;
use crate::tree::{ActionMapping, ChildSource, TreeNode};

/// Row height used when nothing else is configured.
pub const DEFAULT_NODE_HEIGHT: u16 = 22;

/// Predicate over a single node.
pub type NodePredicate<R> = Arc<dyn Fn(&TreeNode<R>) -> bool + Send + Sync>;

/// Decides whether `dragged` may be dropped at a target.
pub type DropPredicate<R> = Arc<dyn Fn(&TreeNode<R>, &DropTarget) -> bool + Send + Sync>;

/// Computes the CSS-like class string of a node.
pub type NodeClassFn<R> = Arc<dyn Fn(&TreeNode<R>) -> String + Send + Sync>;

/// Where a dragged node would land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    /// The node that would become the new parent.
    pub parent: NodeId,
    /// Position among the parent's children.
    pub index: usize,
    /// True when dropping directly onto `parent`.
    pub drop_on_node: bool,
}

/// Scrolls rows into the visible area. Implemented by the rendering layer.
pub trait Viewport<R: TreeRecord>: Send + Sync {
    fn scroll_into_view(&self, node: &TreeNode<R>, force: bool);
}

/// How the initial row height of each node is computed.
pub enum NodeHeight<R> {
    Fixed(u16),
    PerRecord(Arc<dyn Fn(&R) -> u16 + Send + Sync>),
}

impl<R> NodeHeight<R> {
    pub fn height(&self, record: &R) -> u16 {
        match self {
            NodeHeight::Fixed(height) => *height,
            NodeHeight::PerRecord(f) => f(record),
        }
    }
}

impl<R> Clone for NodeHeight<R> {
    fn clone(&self) -> Self {
        match self {
            NodeHeight::Fixed(height) => NodeHeight::Fixed(*height),
            NodeHeight::PerRecord(f) => NodeHeight::PerRecord(Arc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for NodeHeight<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHeight::Fixed(height) => f.debug_tuple("Fixed").field(height).finish(),
            NodeHeight::PerRecord(_) => f.write_str("PerRecord(..)"),
        }
    }
}

/// Plain-data part of the tree options, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeSettings {
    pub fields: FieldMapping,
    pub use_tri_state: bool,
    pub level_padding: u16,
    pub node_height: u16,
    pub scroll_on_activate: bool,
    pub allow_dragover_styling: bool,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            fields: FieldMapping::default(),
            use_tri_state: false,
            level_padding: 0,
            node_height: DEFAULT_NODE_HEIGHT,
            scroll_on_activate: true,
            allow_dragover_styling: true,
        }
    }
}

impl TreeSettings {
    /// Parse settings from a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration shared by every node of a tree.
///
/// Built with consuming setters:
///
/// ```ignore
/// let options = TreeOptions::new()
///     .tri_state(true)
///     .level_padding(16)
///     .child_source(|node: TreeNode<Value>| fetch(node.id().clone()).boxed());
/// ```
pub struct TreeOptions<R: TreeRecord> {
    pub fields: FieldMapping,
    pub child_source: Option<Arc<dyn ChildSource<R>>>,
    pub use_tri_state: bool,
    pub node_height: NodeHeight<R>,
    pub level_padding: u16,
    pub node_class: Option<NodeClassFn<R>>,
    pub allow_drag: Option<NodePredicate<R>>,
    pub allow_drop: Option<DropPredicate<R>>,
    pub allow_dragover_styling: bool,
    pub action_mapping: ActionMapping<R>,
    pub scroll_on_activate: bool,
    pub viewport: Option<Arc<dyn Viewport<R>>>,
}

impl<R: TreeRecord> Default for TreeOptions<R> {
    fn default() -> Self {
        Self::from_settings(TreeSettings::default())
    }
}

impl<R: TreeRecord> TreeOptions<R> {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options from loaded settings, with no callbacks attached.
    pub fn from_settings(settings: TreeSettings) -> Self {
        Self {
            fields: settings.fields,
            child_source: None,
            use_tri_state: settings.use_tri_state,
            node_height: NodeHeight::Fixed(settings.node_height),
            level_padding: settings.level_padding,
            node_class: None,
            allow_drag: None,
            allow_drop: None,
            allow_dragover_styling: settings.allow_dragover_styling,
            action_mapping: ActionMapping::default(),
            scroll_on_activate: settings.scroll_on_activate,
            viewport: None,
        }
    }

    /// Set the record field mapping.
    pub fn fields(mut self, fields: FieldMapping) -> Self {
        self.fields = fields;
        self
    }

    /// Set where lazily loaded children come from.
    pub fn child_source(mut self, source: impl ChildSource<R> + 'static) -> Self {
        self.child_source = Some(Arc::new(source));
        self
    }

    /// Enable or disable tri-state selection.
    pub fn tri_state(mut self, enabled: bool) -> Self {
        self.use_tri_state = enabled;
        self
    }

    /// Use the same row height for every node.
    pub fn node_height(mut self, height: u16) -> Self {
        self.node_height = NodeHeight::Fixed(height);
        self
    }

    /// Compute the row height from each record.
    pub fn node_height_fn(mut self, f: impl Fn(&R) -> u16 + Send + Sync + 'static) -> Self {
        self.node_height = NodeHeight::PerRecord(Arc::new(f));
        self
    }

    /// Set the indentation per level.
    pub fn level_padding(mut self, padding: u16) -> Self {
        self.level_padding = padding;
        self
    }

    /// Set the class function.
    pub fn node_class(mut self, f: impl Fn(&TreeNode<R>) -> String + Send + Sync + 'static) -> Self {
        self.node_class = Some(Arc::new(f));
        self
    }

    /// Set the drag predicate. Dragging is off by default.
    pub fn allow_drag(mut self, f: impl Fn(&TreeNode<R>) -> bool + Send + Sync + 'static) -> Self {
        self.allow_drag = Some(Arc::new(f));
        self
    }

    /// Set the drop predicate. Drops are allowed by default.
    pub fn allow_drop(
        mut self,
        f: impl Fn(&TreeNode<R>, &DropTarget) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.allow_drop = Some(Arc::new(f));
        self
    }

    pub fn allow_dragover_styling(mut self, allow: bool) -> Self {
        self.allow_dragover_styling = allow;
        self
    }

    /// Replace the mouse action mapping.
    pub fn action_mapping(mut self, mapping: ActionMapping<R>) -> Self {
        self.action_mapping = mapping;
        self
    }

    /// Whether activating a node scrolls it into view.
    pub fn scroll_on_activate(mut self, scroll: bool) -> Self {
        self.scroll_on_activate = scroll;
        self
    }

    /// Attach the viewport collaborator.
    pub fn viewport(mut self, viewport: impl Viewport<R> + 'static) -> Self {
        self.viewport = Some(Arc::new(viewport));
        self
    }
}

impl<R: TreeRecord> fmt::Debug for TreeOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("fields", &self.fields)
            .field("child_source", &self.child_source.is_some())
            .field("use_tri_state", &self.use_tri_state)
            .field("node_height", &self.node_height)
            .field("level_padding", &self.level_padding)
            .field("allow_dragover_styling", &self.allow_dragover_styling)
            .field("scroll_on_activate", &self.scroll_on_activate)
            .finish_non_exhaustive()
    }
}
