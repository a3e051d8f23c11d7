//! Error types for tree operations.

use thiserror::Error;

use crate::id::NodeId;

/// Errors surfaced by tree operations.
///
/// Traversal never produces these; absence is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A child source rejected a load.
    #[error("Failed to load children of '{node}': {message}")]
    Load {
        /// The node whose children were requested.
        node: NodeId,
        /// Message from the child source.
        message: String,
    },

    /// The node is not (or no longer) part of the tree.
    #[error("Node '{0}' not found")]
    NodeNotFound(NodeId),

    /// Another node already uses this id.
    #[error("Node id '{0}' is already in use")]
    DuplicateId(NodeId),

    /// A removed feature was called.
    #[error("'{feature}' is no longer supported, use {alternative} instead")]
    Unsupported {
        /// Name of the removed accessor.
        feature: &'static str,
        /// What callers should use instead.
        alternative: &'static str,
    },

    /// Settings could not be parsed.
    #[error("Invalid tree settings: {0}")]
    Settings(String),
}

impl TreeError {
    /// Create a load error for `node`.
    pub fn load(node: impl Into<NodeId>, message: impl Into<String>) -> Self {
        Self::Load {
            node: node.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Settings(err.to_string())
    }
}
