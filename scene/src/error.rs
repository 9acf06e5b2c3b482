use thiserror::Error;

use crate::node::NodeId;

/// Errors surfaced by [`crate::Scene`] operations.
///
/// Matrix math never fails: singular matrices invert to the identity. Only
/// the hierarchy can reject an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("Node with ID {0} not found in scene")]
    NodeNotFound(NodeId),

    #[error("Linking node {node} under {parent} would make it its own ancestor")]
    CycleDetected { node: NodeId, parent: NodeId },
}

pub type Result<T> = std::result::Result<T, SceneError>;
