//! Tree model for hierarchical views.
//!
//! A [`Tree`] owns every node of a hierarchy together with the shared UI
//! state (expanded, selected, active, focused and hidden ids). Nodes are
//! reached through [`TreeNode`] handles, whose getters are recomputed from
//! that state on every call.
//!
//! # Example
//!
//! ```ignore
//! use bough::prelude::*;
//! use serde_json::json;
//!
//! let options = TreeOptions::new()
//!     .tri_state(true)
//!     .child_source(|node: TreeNode<Value>| {
//!         let id = node.id().clone();
//!         async move { fetch_children(&id).await }.boxed()
//!     });
//!
//! let tree = Tree::with_records(
//!     vec![json!({ "id": "home", "hasChildren": true })],
//!     options,
//! );
//!
//! // Expanding starts a background load of the children.
//! tree.node("home").unwrap().expand();
//!
//! let mut events = tree.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if event.kind == TreeEventKind::LoadNodeChildren {
//!         break;
//!     }
//! }
//! ```

mod actions;
mod events;
mod loading;
mod node;
mod selection;
mod shared;
mod state;
mod traversal;

pub use actions::{ActionHandler, ActionMapping, Modifiers, MouseAction, PointerEvent, handlers};
pub use events::{TreeEvent, TreeEventKind};
pub use loading::{ChildSource, LoadState};
pub use node::TreeNode;
pub use shared::TreeStateSets;
pub use state::{Tree, TreeId};
