//! Scene mutation errors

use thiserror::Error;

use crate::node::NodeId;

/// Programmer errors raised when mutating the scene graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A single-child container already holds a child
    #[error("container {container} already has child {existing}; remove it before adding {rejected}")]
    ChildAlreadySet {
        container: NodeId,
        existing: NodeId,
        rejected: NodeId,
    },

    /// Operation on a node that was already disposed
    #[error("{0} is disposed")]
    Disposed(NodeId),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
