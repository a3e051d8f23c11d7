pub mod error;
pub mod field;
pub mod id;
pub mod options;
pub mod tree;

pub use error::TreeError;
pub use id::NodeId;
pub use tree::{Tree, TreeNode};

pub mod prelude {
    pub use crate::error::TreeError;
    pub use crate::field::{Field, FieldMapping, FieldValue, TreeRecord};
    pub use crate::id::NodeId;
    pub use crate::options::{DropTarget, TreeOptions, TreeSettings, Viewport};
    pub use crate::tree::{
        ActionMapping, ChildSource, LoadState, Modifiers, MouseAction, PointerEvent,
    };
    pub use crate::tree::{Tree, TreeEvent, TreeEventKind, TreeId, TreeNode};

    pub use futures::FutureExt;
    pub use serde_json::Value;
}
