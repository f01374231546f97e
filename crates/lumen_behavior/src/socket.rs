//! # Socket Specifications
//!
//! Static descriptions of a node type's sockets, used by connection
//! validation. Handlers declare their sockets once; the editor never has
//! to guess what a type accepts.

use lumen_asset::{AssetResult, BehaviorNode, Document, VariableType};

/// The declared type of a value socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// Always the given type.
    Fixed(VariableType),
    /// The type of the variable named by the node's configuration. Used by
    /// `variable/get` and `variable/set`, whose sockets follow the bound
    /// variable's declared type.
    OfBoundVariable,
}

/// A named value socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSocket {
    /// Socket name.
    pub name: &'static str,
    /// Declared type.
    pub ty: SocketType,
}

impl ValueSocket {
    /// Shorthand for a fixed-type socket.
    #[must_use]
    pub const fn fixed(name: &'static str, ty: VariableType) -> Self {
        Self {
            name,
            ty: SocketType::Fixed(ty),
        }
    }
}

/// Static socket layout of one node type.
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    /// The registered type string, e.g. `"math/add"`.
    pub node_type: &'static str,
    /// Value input sockets.
    pub value_inputs: &'static [ValueSocket],
    /// Inputs that must be assigned a path reference, never linked.
    pub path_inputs: &'static [&'static str],
    /// Value output sockets.
    pub value_outputs: &'static [ValueSocket],
    /// Output flow socket names.
    pub flow_outputs: &'static [&'static str],
    /// True if flow edges may target this node.
    pub has_flow_input: bool,
}

impl NodeSpec {
    /// Looks up a value input socket by name.
    #[must_use]
    pub fn value_input(&self, name: &str) -> Option<&ValueSocket> {
        self.value_inputs.iter().find(|s| s.name == name)
    }

    /// Looks up a value output socket by name.
    #[must_use]
    pub fn value_output(&self, name: &str) -> Option<&ValueSocket> {
        self.value_outputs.iter().find(|s| s.name == name)
    }

    /// True if `name` is one of this type's output flow sockets.
    #[must_use]
    pub fn has_flow_output(&self, name: &str) -> bool {
        self.flow_outputs.contains(&name)
    }

    /// True if `name` is one of this type's path-assigned inputs.
    #[must_use]
    pub fn has_path_input(&self, name: &str) -> bool {
        self.path_inputs.contains(&name)
    }
}

/// Resolves a socket's effective type against a concrete node instance.
///
/// [`SocketType::OfBoundVariable`] reads the node's configuration
/// (`{"variable": index}`) and returns that variable's declared type.
///
/// # Errors
///
/// Propagates a dangling variable reference; a missing configuration maps
/// to a malformed-asset error.
pub fn effective_type(
    document: &Document,
    node: &BehaviorNode,
    socket: SocketType,
) -> AssetResult<VariableType> {
    match socket {
        SocketType::Fixed(ty) => Ok(ty),
        SocketType::OfBoundVariable => {
            let index = bound_variable(node)?;
            Ok(document.variable(index)?.ty())
        }
    }
}

/// The variable index a `variable/get` or `variable/set` node is bound to.
pub fn bound_variable(node: &BehaviorNode) -> AssetResult<usize> {
    node.configuration
        .as_ref()
        .and_then(|config| config.get("variable"))
        .and_then(serde_json::Value::as_u64)
        .map(|index| index as usize)
        .ok_or_else(|| {
            lumen_asset::AssetError::MalformedAsset(format!(
                "behavior node {:?} has no bound variable",
                node.name
            ))
        })
}
