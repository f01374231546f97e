//! # Graph Execution
//!
//! Pull-based interpreter for the behavior graph. Flow edges are pushed
//! (an event node triggers its successors), value links are pulled (a
//! handler asks for an input, which may recursively evaluate upstream
//! nodes). Both directions carry an explicit depth bound so a cyclic
//! graph fails with an error instead of blowing the stack.

use lumen_asset::{
    AssetError, BehaviorExtension, BehaviorNode, Document, Node, ParamValue, PathProperty,
    PathRef, RefKind, Value, VariableType,
};
use lumen_scene::{EntityId, SceneStore, Transform};

use crate::error::{BehaviorError, BehaviorResult};
use crate::registry::NodeRegistry;

/// Maximum depth of chained flow executions in one event.
pub const MAX_FLOW_DEPTH: usize = 256;

/// Maximum depth of recursive value evaluation.
pub const MAX_VALUE_DEPTH: usize = 64;

/// Mutable state a graph execution runs against.
///
/// Borrows the document's node list and behavior extension through the
/// split-borrow accessor, so handlers can walk the graph while writing
/// node transforms.
pub struct ExecContext<'a> {
    registry: &'a NodeRegistry,
    behavior: &'a BehaviorExtension,
    nodes: &'a mut [Node],
    store: Option<&'a mut SceneStore>,
    variables: &'a mut [Value],
    flow_depth: usize,
    value_depth: usize,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(
        registry: &'a NodeRegistry,
        behavior: &'a BehaviorExtension,
        nodes: &'a mut [Node],
        store: Option<&'a mut SceneStore>,
        variables: &'a mut [Value],
    ) -> Self {
        Self {
            registry,
            behavior,
            nodes,
            store,
            variables,
            flow_depth: 0,
            value_depth: 0,
        }
    }

    /// The behavior node at `index`.
    pub fn behavior_node(&self, index: usize) -> BehaviorResult<&BehaviorNode> {
        self.behavior
            .nodes
            .get(index)
            .ok_or_else(|| AssetError::unresolved(RefKind::BehaviorNode, index).into())
    }

    /// Executes the behavior node at `index` as a flow target.
    pub fn execute(&mut self, index: usize) -> BehaviorResult<()> {
        if self.flow_depth >= MAX_FLOW_DEPTH {
            return Err(BehaviorError::FlowDepthExceeded(MAX_FLOW_DEPTH));
        }
        let registry = self.registry;
        let node_type = self.behavior_node(index)?.node_type.clone();
        let handler = registry.handler(&node_type)?;

        self.flow_depth += 1;
        let result = handler.run(self, index);
        self.flow_depth -= 1;
        result
    }

    /// Follows the flow edge named `socket` out of `index`, if assigned.
    /// An unassigned flow socket is a no-op, not an error.
    pub fn trigger(&mut self, index: usize, socket: &str) -> BehaviorResult<()> {
        let target = self.behavior_node(index)?.flow.get(socket).copied();
        match target {
            Some(target) => self.execute(target),
            None => Ok(()),
        }
    }

    /// Evaluates the value output `socket` of the behavior node at `index`.
    pub fn evaluate(&mut self, index: usize, socket: &str) -> BehaviorResult<Value> {
        if self.value_depth >= MAX_VALUE_DEPTH {
            return Err(BehaviorError::ValueDepthExceeded(MAX_VALUE_DEPTH));
        }
        let registry = self.registry;
        let node_type = self.behavior_node(index)?.node_type.clone();
        let handler = registry.handler(&node_type)?;

        self.value_depth += 1;
        let result = handler.evaluate(self, index, socket);
        self.value_depth -= 1;
        result
    }

    /// Resolves the input parameter `socket` of the node at `index` to a
    /// value: constants are cloned, variables and paths are read, links
    /// recursively evaluate their source.
    pub fn input(&mut self, index: usize, socket: &str) -> BehaviorResult<Value> {
        let param = self
            .behavior_node(index)?
            .parameters
            .get(socket)
            .cloned()
            .ok_or_else(|| BehaviorError::MissingInput {
                node: index,
                socket: socket.to_owned(),
            })?;
        match param {
            ParamValue::Constant(value) => Ok(value),
            ParamValue::Variable(variable) => self.variable(variable),
            ParamValue::Path(path) => self.read_path(path),
            ParamValue::Link { node, socket } => self.evaluate(node, &socket),
        }
    }

    /// Typed input helper for `Float` (accepts `Int` numerically).
    pub fn input_float(&mut self, index: usize, socket: &str) -> BehaviorResult<f32> {
        let value = self.input(index, socket)?;
        value.as_float().ok_or_else(|| BehaviorError::ValueMismatch {
            node: index,
            socket: socket.to_owned(),
            expected: VariableType::Float,
        })
    }

    /// Typed input helper for `Bool`.
    pub fn input_bool(&mut self, index: usize, socket: &str) -> BehaviorResult<bool> {
        match self.input(index, socket)? {
            Value::Bool(b) => Ok(b),
            _ => Err(BehaviorError::ValueMismatch {
                node: index,
                socket: socket.to_owned(),
                expected: VariableType::Bool,
            }),
        }
    }

    /// Typed input helper for `Vec3`.
    pub fn input_vec3(&mut self, index: usize, socket: &str) -> BehaviorResult<[f32; 3]> {
        match self.input(index, socket)? {
            Value::Vec3(v) => Ok(v),
            _ => Err(BehaviorError::ValueMismatch {
                node: index,
                socket: socket.to_owned(),
                expected: VariableType::Vec3,
            }),
        }
    }

    /// Typed input helper for `Vec4`.
    pub fn input_vec4(&mut self, index: usize, socket: &str) -> BehaviorResult<[f32; 4]> {
        match self.input(index, socket)? {
            Value::Vec4(v) => Ok(v),
            _ => Err(BehaviorError::ValueMismatch {
                node: index,
                socket: socket.to_owned(),
                expected: VariableType::Vec4,
            }),
        }
    }

    /// The path a parameter must be assigned to, for node-targeting inputs.
    pub fn path_param(&self, index: usize, socket: &str) -> BehaviorResult<PathRef> {
        match self.behavior_node(index)?.parameters.get(socket) {
            Some(ParamValue::Path(path)) => Ok(*path),
            Some(_) => Err(AssetError::MalformedAsset(format!(
                "behavior node {index} input {socket:?} must be a path"
            ))
            .into()),
            None => Err(BehaviorError::MissingInput {
                node: index,
                socket: socket.to_owned(),
            }),
        }
    }

    /// Reads a scene node property through a path reference.
    pub fn read_path(&self, path: PathRef) -> BehaviorResult<Value> {
        let node = self
            .nodes
            .get(path.node)
            .ok_or(AssetError::unresolved(RefKind::Node, path.node))?;
        Ok(match path.property {
            PathProperty::Translation => Value::Vec3(node.translation),
            PathProperty::Rotation => Value::Vec4(node.rotation),
            PathProperty::Scale => Value::Vec3(node.scale),
        })
    }

    /// Writes a scene node property through a path reference, keeping the
    /// scene store's transform column in sync when one is attached.
    pub fn write_path(&mut self, path: PathRef, value: Value) -> BehaviorResult<()> {
        let node = self
            .nodes
            .get_mut(path.node)
            .ok_or(AssetError::unresolved(RefKind::Node, path.node))?;
        match (path.property, &value) {
            (PathProperty::Translation, Value::Vec3(v)) => node.translation = *v,
            (PathProperty::Scale, Value::Vec3(v)) => node.scale = *v,
            (PathProperty::Rotation, Value::Vec4(v)) => node.rotation = *v,
            (property, _) => {
                return Err(BehaviorError::ValueMismatch {
                    node: path.node,
                    socket: property.name().to_owned(),
                    expected: property.value_type(),
                });
            }
        }
        let transform = Transform {
            translation: node.translation,
            rotation: node.rotation,
            scale: node.scale,
        };
        if let Some(store) = self.store.as_deref_mut() {
            store.set_transform(EntityId(path.node as u32), transform)?;
        }
        Ok(())
    }

    /// Reads a variable's current value.
    pub fn variable(&self, index: usize) -> BehaviorResult<Value> {
        self.variables
            .get(index)
            .cloned()
            .ok_or_else(|| AssetError::unresolved(RefKind::Variable, index).into())
    }

    /// Overwrites a variable's current value.
    pub fn set_variable(&mut self, index: usize, value: Value) -> BehaviorResult<()> {
        let slot = self
            .variables
            .get_mut(index)
            .ok_or(AssetError::unresolved(RefKind::Variable, index))?;
        *slot = value;
        Ok(())
    }
}

/// Per-session runtime state of one graph: the variable values.
///
/// Created when a document is installed and lives until the next load;
/// variables keep their values across events within one session.
#[derive(Debug, Clone, Default)]
pub struct GraphRuntime {
    variables: Vec<Value>,
}

impl GraphRuntime {
    /// Creates runtime state with every variable at its initial value.
    #[must_use]
    pub fn new(document: &Document) -> Self {
        Self {
            variables: document.variable_defaults(),
        }
    }

    /// Current variable values, in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[Value] {
        &self.variables
    }

    /// Fires every event node of the given type (`"lifecycle/on_start"`,
    /// `"lifecycle/on_tick"`, or a custom event type), in declaration
    /// order. Returns the number of event nodes fired.
    pub fn fire_event(
        &mut self,
        registry: &NodeRegistry,
        document: &mut Document,
        mut store: Option<&mut SceneStore>,
        event_type: &str,
    ) -> BehaviorResult<usize> {
        let (nodes, behavior) = document.nodes_and_behavior_mut();
        let starts: Vec<usize> = behavior
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.node_type == event_type)
            .map(|(index, _)| index)
            .collect();

        for &start in &starts {
            let mut ctx = ExecContext::new(
                registry,
                behavior,
                nodes,
                store.as_deref_mut(),
                &mut self.variables,
            );
            ctx.execute(start)?;
        }

        tracing::trace!(event_type, fired = starts.len(), "fired event");
        Ok(starts.len())
    }
}
