//! # Behavior Error Types

use lumen_asset::VariableType;
use thiserror::Error;

/// Errors from wiring two sockets together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Source and target value sockets have different types.
    #[error("type mismatch: source is {source_type:?}, target wants {target_type:?}")]
    TypeMismatch {
        /// Type of the source output socket.
        source_type: VariableType,
        /// Type of the target input socket.
        target_type: VariableType,
    },

    /// The target socket already has a connection or assigned parameter.
    #[error("socket {socket:?} on behavior node {node} is already connected")]
    AlreadyConnected {
        /// Target behavior node index.
        node: usize,
        /// Target socket name.
        socket: String,
    },

    /// One of the endpoint behavior nodes does not exist.
    #[error("behavior node {0} does not exist")]
    MissingEndpoint(usize),

    /// A named socket does not exist on the node's type.
    #[error("node type {node_type:?} has no socket {socket:?}")]
    UnknownSocket {
        /// The node's registered type.
        node_type: String,
        /// The socket that was asked for.
        socket: String,
    },
}

/// Errors from editing or executing a behavior graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BehaviorError {
    /// Connection validation failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A document lookup or mutation failed.
    #[error(transparent)]
    Asset(#[from] lumen_asset::AssetError),

    /// A scene store access failed.
    #[error(transparent)]
    Scene(#[from] lumen_scene::SceneError),

    /// A node type is not registered.
    #[error("unknown behavior node type {0:?}")]
    UnknownNodeType(String),

    /// A flow edge targeted a node type with no flow input.
    #[error("behavior node type {0:?} is not executable")]
    NotExecutable(String),

    /// A required input parameter is not assigned.
    #[error("behavior node {node} has no input {socket:?}")]
    MissingInput {
        /// Behavior node index.
        node: usize,
        /// Missing input socket name.
        socket: String,
    },

    /// A pulled value had the wrong type at evaluation time.
    #[error("behavior node {node} socket {socket:?}: expected {expected:?} value")]
    ValueMismatch {
        /// Behavior node index.
        node: usize,
        /// Socket name.
        socket: String,
        /// The type the handler wanted.
        expected: VariableType,
    },

    /// Flow execution exceeded the recursion bound, i.e. the graph loops.
    #[error("flow depth limit {0} exceeded")]
    FlowDepthExceeded(usize),

    /// Value evaluation exceeded the recursion bound, i.e. links form a cycle.
    #[error("value evaluation depth limit {0} exceeded")]
    ValueDepthExceeded(usize),
}

/// Result type for behavior operations.
pub type BehaviorResult<T> = Result<T, BehaviorError>;
