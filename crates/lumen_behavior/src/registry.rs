//! # Node Registry
//!
//! Maps node type strings to their handlers. A handler owns the static
//! socket spec used by connection validation and the runtime logic used
//! by the interpreter. Host applications can register their own types on
//! top of the built-in set.

use std::collections::BTreeMap;

use lumen_asset::{Value, VariableType};

use crate::error::{BehaviorError, BehaviorResult, ConnectError};
use crate::exec::ExecContext;
use crate::socket::{bound_variable, NodeSpec, SocketType, ValueSocket};

/// Event type fired once when a scene finishes installing.
pub const EVENT_ON_START: &str = "lifecycle/on_start";

/// Event type fired every simulation tick.
pub const EVENT_ON_TICK: &str = "lifecycle/on_tick";

/// Runtime behavior of one node type.
pub trait NodeHandler: Send + Sync {
    /// The static socket layout of this type.
    fn spec(&self) -> &'static NodeSpec;

    /// Executes the node as a flow target.
    fn run(&self, _ctx: &mut ExecContext<'_>, _index: usize) -> BehaviorResult<()> {
        Err(BehaviorError::NotExecutable(
            self.spec().node_type.to_owned(),
        ))
    }

    /// Evaluates one of the node's value outputs.
    fn evaluate(
        &self,
        _ctx: &mut ExecContext<'_>,
        _index: usize,
        socket: &str,
    ) -> BehaviorResult<Value> {
        Err(ConnectError::UnknownSocket {
            node_type: self.spec().node_type.to_owned(),
            socket: socket.to_owned(),
        }
        .into())
    }
}

/// The node type table.
pub struct NodeRegistry {
    handlers: BTreeMap<&'static str, Box<dyn NodeHandler>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl NodeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the built-in node set.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(OnStart));
        registry.register(Box::new(OnTick));
        registry.register(Box::new(Sequence));
        registry.register(Box::new(Branch));
        registry.register(Box::new(MathAdd));
        registry.register(Box::new(CombineVec3));
        registry.register(Box::new(VariableGet));
        registry.register(Box::new(VariableSet));
        registry.register(Box::new(Translate));
        registry.register(Box::new(SetRotation));
        registry.register(Box::new(SetScale));
        registry.register(Box::new(GetTranslation));
        registry.register(Box::new(DebugLog));
        registry
    }

    /// Registers a handler under its spec's type string, replacing any
    /// previous handler for that type.
    pub fn register(&mut self, handler: Box<dyn NodeHandler>) {
        self.handlers.insert(handler.spec().node_type, handler);
    }

    /// Looks up the handler for a type string.
    pub fn handler(&self, node_type: &str) -> BehaviorResult<&dyn NodeHandler> {
        self.handlers
            .get(node_type)
            .map(Box::as_ref)
            .ok_or_else(|| BehaviorError::UnknownNodeType(node_type.to_owned()))
    }

    /// Looks up the socket spec for a type string.
    pub fn spec(&self, node_type: &str) -> BehaviorResult<&'static NodeSpec> {
        Ok(self.handler(node_type)?.spec())
    }

    /// All registered type strings, sorted.
    pub fn node_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

// ============================================================================
// Lifecycle events
// ============================================================================

struct OnStart;

static ON_START_SPEC: NodeSpec = NodeSpec {
    node_type: EVENT_ON_START,
    value_inputs: &[],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: false,
};

impl NodeHandler for OnStart {
    fn spec(&self) -> &'static NodeSpec {
        &ON_START_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        ctx.trigger(index, "out")
    }
}

struct OnTick;

static ON_TICK_SPEC: NodeSpec = NodeSpec {
    node_type: EVENT_ON_TICK,
    value_inputs: &[],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: false,
};

impl NodeHandler for OnTick {
    fn spec(&self) -> &'static NodeSpec {
        &ON_TICK_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        ctx.trigger(index, "out")
    }
}

// ============================================================================
// Flow control
// ============================================================================

struct Sequence;

static SEQUENCE_SPEC: NodeSpec = NodeSpec {
    node_type: "flow/sequence",
    value_inputs: &[],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["0", "1", "2", "3"],
    has_flow_input: true,
};

impl NodeHandler for Sequence {
    fn spec(&self) -> &'static NodeSpec {
        &SEQUENCE_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        for socket in SEQUENCE_SPEC.flow_outputs {
            ctx.trigger(index, socket)?;
        }
        Ok(())
    }
}

struct Branch;

static BRANCH_SPEC: NodeSpec = NodeSpec {
    node_type: "flow/branch",
    value_inputs: &[ValueSocket::fixed("condition", VariableType::Bool)],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["true", "false"],
    has_flow_input: true,
};

impl NodeHandler for Branch {
    fn spec(&self) -> &'static NodeSpec {
        &BRANCH_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let socket = if ctx.input_bool(index, "condition")? {
            "true"
        } else {
            "false"
        };
        ctx.trigger(index, socket)
    }
}

// ============================================================================
// Math
// ============================================================================

struct MathAdd;

static MATH_ADD_SPEC: NodeSpec = NodeSpec {
    node_type: "math/add",
    value_inputs: &[
        ValueSocket::fixed("a", VariableType::Float),
        ValueSocket::fixed("b", VariableType::Float),
    ],
    path_inputs: &[],
    value_outputs: &[ValueSocket::fixed("result", VariableType::Float)],
    flow_outputs: &[],
    has_flow_input: false,
};

impl NodeHandler for MathAdd {
    fn spec(&self) -> &'static NodeSpec {
        &MATH_ADD_SPEC
    }

    fn evaluate(
        &self,
        ctx: &mut ExecContext<'_>,
        index: usize,
        socket: &str,
    ) -> BehaviorResult<Value> {
        match socket {
            "result" => {
                let a = ctx.input_float(index, "a")?;
                let b = ctx.input_float(index, "b")?;
                Ok(Value::Float(a + b))
            }
            other => Err(ConnectError::UnknownSocket {
                node_type: MATH_ADD_SPEC.node_type.to_owned(),
                socket: other.to_owned(),
            }
            .into()),
        }
    }
}

struct CombineVec3;

static COMBINE_VEC3_SPEC: NodeSpec = NodeSpec {
    node_type: "math/combine_vec3",
    value_inputs: &[
        ValueSocket::fixed("x", VariableType::Float),
        ValueSocket::fixed("y", VariableType::Float),
        ValueSocket::fixed("z", VariableType::Float),
    ],
    path_inputs: &[],
    value_outputs: &[ValueSocket::fixed("result", VariableType::Vec3)],
    flow_outputs: &[],
    has_flow_input: false,
};

impl NodeHandler for CombineVec3 {
    fn spec(&self) -> &'static NodeSpec {
        &COMBINE_VEC3_SPEC
    }

    fn evaluate(
        &self,
        ctx: &mut ExecContext<'_>,
        index: usize,
        socket: &str,
    ) -> BehaviorResult<Value> {
        match socket {
            "result" => {
                let x = ctx.input_float(index, "x")?;
                let y = ctx.input_float(index, "y")?;
                let z = ctx.input_float(index, "z")?;
                Ok(Value::Vec3([x, y, z]))
            }
            other => Err(ConnectError::UnknownSocket {
                node_type: COMBINE_VEC3_SPEC.node_type.to_owned(),
                socket: other.to_owned(),
            }
            .into()),
        }
    }
}

// ============================================================================
// Variables
// ============================================================================

struct VariableGet;

static VARIABLE_GET_SPEC: NodeSpec = NodeSpec {
    node_type: "variable/get",
    value_inputs: &[],
    path_inputs: &[],
    value_outputs: &[ValueSocket {
        name: "value",
        ty: SocketType::OfBoundVariable,
    }],
    flow_outputs: &[],
    has_flow_input: false,
};

impl NodeHandler for VariableGet {
    fn spec(&self) -> &'static NodeSpec {
        &VARIABLE_GET_SPEC
    }

    fn evaluate(
        &self,
        ctx: &mut ExecContext<'_>,
        index: usize,
        socket: &str,
    ) -> BehaviorResult<Value> {
        match socket {
            "value" => {
                let variable = bound_variable(ctx.behavior_node(index)?)?;
                ctx.variable(variable)
            }
            other => Err(ConnectError::UnknownSocket {
                node_type: VARIABLE_GET_SPEC.node_type.to_owned(),
                socket: other.to_owned(),
            }
            .into()),
        }
    }
}

struct VariableSet;

static VARIABLE_SET_SPEC: NodeSpec = NodeSpec {
    node_type: "variable/set",
    value_inputs: &[ValueSocket {
        name: "value",
        ty: SocketType::OfBoundVariable,
    }],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: true,
};

impl NodeHandler for VariableSet {
    fn spec(&self) -> &'static NodeSpec {
        &VARIABLE_SET_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let variable = bound_variable(ctx.behavior_node(index)?)?;
        let value = ctx.input(index, "value")?;
        ctx.set_variable(variable, value)?;
        ctx.trigger(index, "out")
    }
}

// ============================================================================
// Scene node access
// ============================================================================

struct Translate;

static TRANSLATE_SPEC: NodeSpec = NodeSpec {
    node_type: "node/translate",
    value_inputs: &[ValueSocket::fixed("value", VariableType::Vec3)],
    path_inputs: &["target"],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: true,
};

impl NodeHandler for Translate {
    fn spec(&self) -> &'static NodeSpec {
        &TRANSLATE_SPEC
    }

    /// Adds the input vector to the targeted node's translation.
    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let path = ctx.path_param(index, "target")?;
        let delta = ctx.input_vec3(index, "value")?;
        let Value::Vec3(current) = ctx.read_path(path)? else {
            return Err(BehaviorError::ValueMismatch {
                node: path.node,
                socket: "target".to_owned(),
                expected: VariableType::Vec3,
            });
        };
        ctx.write_path(
            path,
            Value::Vec3([
                current[0] + delta[0],
                current[1] + delta[1],
                current[2] + delta[2],
            ]),
        )?;
        ctx.trigger(index, "out")
    }
}

struct SetRotation;

static SET_ROTATION_SPEC: NodeSpec = NodeSpec {
    node_type: "node/set_rotation",
    value_inputs: &[ValueSocket::fixed("value", VariableType::Vec4)],
    path_inputs: &["target"],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: true,
};

impl NodeHandler for SetRotation {
    fn spec(&self) -> &'static NodeSpec {
        &SET_ROTATION_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let path = ctx.path_param(index, "target")?;
        let value = ctx.input_vec4(index, "value")?;
        ctx.write_path(path, Value::Vec4(value))?;
        ctx.trigger(index, "out")
    }
}

struct SetScale;

static SET_SCALE_SPEC: NodeSpec = NodeSpec {
    node_type: "node/set_scale",
    value_inputs: &[ValueSocket::fixed("value", VariableType::Vec3)],
    path_inputs: &["target"],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: true,
};

impl NodeHandler for SetScale {
    fn spec(&self) -> &'static NodeSpec {
        &SET_SCALE_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let path = ctx.path_param(index, "target")?;
        let value = ctx.input_vec3(index, "value")?;
        ctx.write_path(path, Value::Vec3(value))?;
        ctx.trigger(index, "out")
    }
}

struct GetTranslation;

static GET_TRANSLATION_SPEC: NodeSpec = NodeSpec {
    node_type: "node/get_translation",
    value_inputs: &[],
    path_inputs: &["target"],
    value_outputs: &[ValueSocket::fixed("value", VariableType::Vec3)],
    flow_outputs: &[],
    has_flow_input: false,
};

impl NodeHandler for GetTranslation {
    fn spec(&self) -> &'static NodeSpec {
        &GET_TRANSLATION_SPEC
    }

    fn evaluate(
        &self,
        ctx: &mut ExecContext<'_>,
        index: usize,
        socket: &str,
    ) -> BehaviorResult<Value> {
        match socket {
            "value" => {
                let path = ctx.path_param(index, "target")?;
                ctx.read_path(path)
            }
            other => Err(ConnectError::UnknownSocket {
                node_type: GET_TRANSLATION_SPEC.node_type.to_owned(),
                socket: other.to_owned(),
            }
            .into()),
        }
    }
}

// ============================================================================
// Debug
// ============================================================================

struct DebugLog;

static DEBUG_LOG_SPEC: NodeSpec = NodeSpec {
    node_type: "debug/log",
    value_inputs: &[ValueSocket::fixed("message", VariableType::String)],
    path_inputs: &[],
    value_outputs: &[],
    flow_outputs: &["out"],
    has_flow_input: true,
};

impl NodeHandler for DebugLog {
    fn spec(&self) -> &'static NodeSpec {
        &DEBUG_LOG_SPEC
    }

    fn run(&self, ctx: &mut ExecContext<'_>, index: usize) -> BehaviorResult<()> {
        let message = match ctx.input(index, "message")? {
            Value::String(s) => s,
            other => format!("{other:?}"),
        };
        let name = ctx.behavior_node(index)?.name.clone();
        tracing::info!(node = %name, "{message}");
        ctx.trigger(index, "out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set_registered() {
        let registry = NodeRegistry::with_builtins();
        for node_type in [
            EVENT_ON_START,
            EVENT_ON_TICK,
            "flow/sequence",
            "flow/branch",
            "math/add",
            "math/combine_vec3",
            "variable/get",
            "variable/set",
            "node/translate",
            "node/set_rotation",
            "node/set_scale",
            "node/get_translation",
            "debug/log",
        ] {
            assert!(registry.handler(node_type).is_ok(), "{node_type} missing");
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let registry = NodeRegistry::with_builtins();
        assert!(matches!(
            registry.handler("physics/apply_force"),
            Err(BehaviorError::UnknownNodeType(_))
        ));
    }
}
