//! # Behavior Graph Extension
//!
//! Data model for the `EXT_behavior_graph` root extension: the node-graph
//! program embedded in a document, plus its named variables.
//!
//! ## Reference discipline
//!
//! Behavior nodes reference each other, variables, and scene nodes by
//! index only. Parameters are an explicit tagged union - every read/write
//! site matches exhaustively, so a link can never be silently treated as
//! a constant.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{AssetError, AssetResult};

/// Root extension key the behavior graph is stored under.
pub const BEHAVIOR_EXTENSION: &str = "EXT_behavior_graph";

/// The value/variable type lattice of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Two-component vector.
    Vec2,
    /// Three-component vector.
    Vec3,
    /// Four-component vector; also used for quaternions.
    Vec4,
}

impl VariableType {
    /// Maps the wire name ("quat" is accepted as an alias for vec4).
    pub fn from_name(name: &str) -> AssetResult<Self> {
        match name {
            "string" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "float" | "number" => Ok(Self::Float),
            "vec2" => Ok(Self::Vec2),
            "vec3" => Ok(Self::Vec3),
            "vec4" | "quat" => Ok(Self::Vec4),
            other => Err(AssetError::MalformedAsset(format!(
                "unknown variable type {other:?}"
            ))),
        }
    }

    /// The wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
        }
    }
}

/// A runtime value flowing through the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Two-component vector.
    Vec2([f32; 2]),
    /// Three-component vector.
    Vec3([f32; 3]),
    /// Four-component vector / quaternion.
    Vec4([f32; 4]),
}

impl Value {
    /// The zero value of a type: `""`, `false`, `0`, `0.0`, zero vectors.
    #[must_use]
    pub fn zero(ty: VariableType) -> Self {
        match ty {
            VariableType::String => Self::String(String::new()),
            VariableType::Bool => Self::Bool(false),
            VariableType::Int => Self::Int(0),
            VariableType::Float => Self::Float(0.0),
            VariableType::Vec2 => Self::Vec2([0.0; 2]),
            VariableType::Vec3 => Self::Vec3([0.0; 3]),
            VariableType::Vec4 => Self::Vec4([0.0; 4]),
        }
    }

    /// The type of this value.
    #[must_use]
    pub const fn value_type(&self) -> VariableType {
        match self {
            Self::String(_) => VariableType::String,
            Self::Bool(_) => VariableType::Bool,
            Self::Int(_) => VariableType::Int,
            Self::Float(_) => VariableType::Float,
            Self::Vec2(_) => VariableType::Vec2,
            Self::Vec3(_) => VariableType::Vec3,
            Self::Vec4(_) => VariableType::Vec4,
        }
    }

    /// Numeric view: accepts both `Int` and `Float`.
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f32),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Parses a value whose type is declared out-of-band (variables).
    ///
    /// The JSON shape must match the declared type exactly.
    pub fn from_json_typed(ty: VariableType, value: &serde_json::Value) -> AssetResult<Self> {
        let mismatch = || {
            AssetError::MalformedAsset(format!(
                "initial value {value} does not match declared type {}",
                ty.name()
            ))
        };
        match ty {
            VariableType::String => value
                .as_str()
                .map(|s| Self::String(s.to_owned()))
                .ok_or_else(mismatch),
            VariableType::Bool => value.as_bool().map(Self::Bool).ok_or_else(mismatch),
            VariableType::Int => value
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Self::Int)
                .ok_or_else(mismatch),
            #[allow(clippy::cast_possible_truncation)]
            VariableType::Float => value
                .as_f64()
                .map(|f| Self::Float(f as f32))
                .ok_or_else(mismatch),
            VariableType::Vec2 => {
                let [x, y] = components::<2>(value).ok_or_else(mismatch)?;
                Ok(Self::Vec2([x, y]))
            }
            VariableType::Vec3 => {
                let [x, y, z] = components::<3>(value).ok_or_else(mismatch)?;
                Ok(Self::Vec3([x, y, z]))
            }
            VariableType::Vec4 => {
                let [x, y, z, w] = components::<4>(value).ok_or_else(mismatch)?;
                Ok(Self::Vec4([x, y, z, w]))
            }
        }
    }

    /// Parses a constant parameter, inferring the type from the JSON shape.
    ///
    /// Whole numbers parse as `Int`; anything with a fraction as `Float`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_json(value: &serde_json::Value) -> AssetResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(Self::Int).map_err(|_| {
                        AssetError::MalformedAsset(format!("integer constant {i} out of range"))
                    })
                } else {
                    Ok(Self::Float(n.as_f64().unwrap_or(0.0) as f32))
                }
            }
            serde_json::Value::Object(map) => match map.len() {
                2 => Self::from_json_typed(VariableType::Vec2, value),
                3 => Self::from_json_typed(VariableType::Vec3, value),
                4 => Self::from_json_typed(VariableType::Vec4, value),
                _ => Err(AssetError::MalformedAsset(format!(
                    "constant {value} is not a vector shape"
                ))),
            },
            other => Err(AssetError::MalformedAsset(format!(
                "unsupported constant shape {other}"
            ))),
        }
    }

    /// Serializes to the wire shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => json!(s),
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Float(f) => json!(f),
            Self::Vec2([x, y]) => json!({ "x": x, "y": y }),
            Self::Vec3([x, y, z]) => json!({ "x": x, "y": y, "z": z }),
            Self::Vec4([x, y, z, w]) => json!({ "x": x, "y": y, "z": z, "w": w }),
        }
    }
}

/// Pulls `{x, y[, z[, w]]}` components from a JSON object.
fn components<const N: usize>(value: &serde_json::Value) -> Option<[f32; N]> {
    const KEYS: [&str; 4] = ["x", "y", "z", "w"];
    let map = value.as_object()?;
    if map.len() != N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (i, key) in KEYS.iter().take(N).enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        {
            out[i] = map.get(*key)?.as_f64()? as f32;
        }
    }
    Some(out)
}

/// The node property a [`PathRef`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProperty {
    /// `/nodes/{i}/translation`
    Translation,
    /// `/nodes/{i}/rotation`
    Rotation,
    /// `/nodes/{i}/scale`
    Scale,
}

impl PathProperty {
    /// The value type carried by this property.
    #[must_use]
    pub const fn value_type(self) -> VariableType {
        match self {
            Self::Translation | Self::Scale => VariableType::Vec3,
            Self::Rotation => VariableType::Vec4,
        }
    }

    /// The path segment name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
        }
    }
}

/// A structured reference of the form `/nodes/{index}/{property}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRef {
    /// Scene node index.
    pub node: usize,
    /// Addressed property.
    pub property: PathProperty,
}

impl PathRef {
    /// Parses the `/nodes/{index}/{property}` form.
    pub fn parse(path: &str) -> AssetResult<Self> {
        let malformed = || AssetError::MalformedAsset(format!("bad path reference {path:?}"));
        let rest = path.strip_prefix("/nodes/").ok_or_else(malformed)?;
        let (index, property) = rest.split_once('/').ok_or_else(malformed)?;
        let node: usize = index.parse().map_err(|_| malformed())?;
        let property = match property {
            "translation" => PathProperty::Translation,
            "rotation" => PathProperty::Rotation,
            "scale" => PathProperty::Scale,
            _ => return Err(malformed()),
        };
        Ok(Self { node, property })
    }
}

impl std::fmt::Display for PathRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/nodes/{}/{}", self.node, self.property.name())
    }
}

/// An input parameter of a behavior node.
///
/// Exactly one source per parameter; the variants are mutually exclusive
/// by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Inline constant.
    Constant(Value),
    /// Pulled from another node's output socket.
    Link {
        /// Source behavior node index.
        node: usize,
        /// Source output socket name.
        socket: String,
    },
    /// Read from a graph variable.
    Variable(usize),
    /// Read from / written to a scene node property.
    Path(PathRef),
}

impl ParamValue {
    /// True if this parameter links to the given behavior node index.
    #[must_use]
    pub fn links_to(&self, index: usize) -> bool {
        matches!(self, Self::Link { node, .. } if *node == index)
    }

    /// Shifts link targets above `removed` down by one (node removal).
    pub fn shift_node_refs_above(&mut self, removed: usize) {
        if let Self::Link { node, .. } = self {
            if *node > removed {
                *node -= 1;
            }
        }
    }

    /// Parses the tagged wire shape: exactly one of
    /// `{"value": ...}`, `{"link": {"node", "socket"}}`,
    /// `{"variable": i}`, `{"path": "/nodes/i/prop"}`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_json(value: &serde_json::Value) -> AssetResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            AssetError::MalformedAsset(format!("parameter {value} is not an object"))
        })?;
        if map.len() != 1 {
            return Err(AssetError::MalformedAsset(format!(
                "parameter {value} must have exactly one source"
            )));
        }
        let (key, inner) = map.iter().next().ok_or_else(|| {
            AssetError::MalformedAsset("empty parameter object".into())
        })?;
        match key.as_str() {
            "value" => Ok(Self::Constant(Value::from_json(inner)?)),
            "link" => {
                let node = inner
                    .get("node")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| {
                        AssetError::MalformedAsset(format!("bad link parameter {inner}"))
                    })?;
                let socket = inner
                    .get("socket")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        AssetError::MalformedAsset(format!("bad link parameter {inner}"))
                    })?;
                Ok(Self::Link {
                    node: node as usize,
                    socket: socket.to_owned(),
                })
            }
            "variable" => {
                let index = inner.as_u64().ok_or_else(|| {
                    AssetError::MalformedAsset(format!("bad variable parameter {inner}"))
                })?;
                Ok(Self::Variable(index as usize))
            }
            "path" => {
                let path = inner.as_str().ok_or_else(|| {
                    AssetError::MalformedAsset(format!("bad path parameter {inner}"))
                })?;
                Ok(Self::Path(PathRef::parse(path)?))
            }
            other => Err(AssetError::MalformedAsset(format!(
                "unknown parameter source {other:?}"
            ))),
        }
    }

    /// Serializes to the tagged wire shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Constant(value) => json!({ "value": value.to_json() }),
            Self::Link { node, socket } => json!({ "link": { "node": node, "socket": socket } }),
            Self::Variable(index) => json!({ "variable": index }),
            Self::Path(path) => json!({ "path": path.to_string() }),
        }
    }
}

/// Editor-facing extras carried on every behavior node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeExtras {
    /// Canvas position in the editor.
    pub position: [f32; 2],
    /// Owning graph id, for multi-graph documents.
    pub owning_graph: Option<String>,
}

/// One node of the behavior graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorNode {
    /// Registered node type, e.g. `"node/translate"`.
    pub node_type: String,
    /// Name, unique within the document.
    pub name: String,
    /// Opaque per-type configuration, passed through for the editor.
    pub configuration: Option<serde_json::Value>,
    /// Input parameters by socket name.
    pub parameters: BTreeMap<String, ParamValue>,
    /// Flow edges: output flow socket name to target behavior node index.
    pub flow: BTreeMap<String, usize>,
    /// Editor extras.
    pub extras: NodeExtras,
}

impl BehaviorNode {
    /// Creates an empty node of the given type.
    #[must_use]
    pub fn new(node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A named, typed graph variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    ty: VariableType,
    initial: Value,
}

impl Variable {
    /// Creates a variable with the type's zero initial value.
    #[must_use]
    pub fn new(name: String, ty: VariableType) -> Self {
        Self {
            name,
            ty,
            initial: Value::zero(ty),
        }
    }

    /// The variable's current type.
    #[inline]
    #[must_use]
    pub const fn ty(&self) -> VariableType {
        self.ty
    }

    /// The initial value.
    #[inline]
    #[must_use]
    pub const fn initial(&self) -> &Value {
        &self.initial
    }

    /// Changes the type, resetting the initial value to the new type's zero.
    pub fn set_type(&mut self, ty: VariableType) {
        self.ty = ty;
        self.initial = Value::zero(ty);
    }

    /// Sets the initial value; its type must match the declared type.
    pub fn set_initial(&mut self, value: Value) -> AssetResult<()> {
        if value.value_type() != self.ty {
            return Err(AssetError::MalformedAsset(format!(
                "initial value type {} does not match variable type {}",
                value.value_type().name(),
                self.ty.name()
            )));
        }
        self.initial = value;
        Ok(())
    }
}

/// The whole behavior extension: nodes plus variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorExtension {
    /// Behavior node list.
    pub nodes: Vec<BehaviorNode>,
    /// Variable list.
    pub variables: Vec<Variable>,
}

impl BehaviorExtension {
    /// Parses the extension object from root-extension JSON.
    pub fn from_json(value: &serde_json::Value) -> AssetResult<Self> {
        let mut out = Self::default();

        if let Some(vars) = value.get("variables").and_then(serde_json::Value::as_array) {
            for raw in vars {
                let name = raw
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| AssetError::MalformedAsset("variable without name".into()))?;
                let ty = raw
                    .get("type")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| AssetError::MalformedAsset("variable without type".into()))?;
                let ty = VariableType::from_name(ty)?;
                let mut var = Variable::new(name.to_owned(), ty);
                if let Some(initial) = raw.get("initialValue") {
                    var.set_initial(Value::from_json_typed(ty, initial)?)?;
                }
                out.variables.push(var);
            }
        }

        if let Some(nodes) = value
            .get("behaviorNodes")
            .and_then(serde_json::Value::as_array)
        {
            for raw in nodes {
                out.nodes.push(Self::node_from_json(raw)?);
            }
        }
        Ok(out)
    }

    fn node_from_json(raw: &serde_json::Value) -> AssetResult<BehaviorNode> {
        let node_type = raw
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AssetError::MalformedAsset("behavior node without type".into()))?;
        let name = raw
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AssetError::MalformedAsset("behavior node without name".into()))?;
        let mut node = BehaviorNode::new(node_type, name);
        node.configuration = raw.get("configuration").cloned();

        if let Some(params) = raw.get("parameters").and_then(serde_json::Value::as_object) {
            for (socket, param) in params {
                node.parameters
                    .insert(socket.clone(), ParamValue::from_json(param)?);
            }
        }
        if let Some(flow) = raw.get("flow").and_then(serde_json::Value::as_object) {
            for (socket, target) in flow {
                let target = target.as_u64().ok_or_else(|| {
                    AssetError::MalformedAsset(format!("bad flow target {target}"))
                })?;
                #[allow(clippy::cast_possible_truncation)]
                node.flow.insert(socket.clone(), target as usize);
            }
        }
        if let Some(extras) = raw.get("extras") {
            if let Some(pos) = extras.get("position").and_then(serde_json::Value::as_array) {
                #[allow(clippy::cast_possible_truncation)]
                if let [x, y] = pos.as_slice() {
                    node.extras.position = [
                        x.as_f64().unwrap_or(0.0) as f32,
                        y.as_f64().unwrap_or(0.0) as f32,
                    ];
                }
            }
            node.extras.owning_graph = extras
                .get("graph")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
        }
        Ok(node)
    }

    /// Serializes the extension to its wire shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .map(|node| {
                let parameters: serde_json::Map<String, serde_json::Value> = node
                    .parameters
                    .iter()
                    .map(|(socket, param)| (socket.clone(), param.to_json()))
                    .collect();
                let flow: serde_json::Map<String, serde_json::Value> = node
                    .flow
                    .iter()
                    .map(|(socket, target)| (socket.clone(), json!(target)))
                    .collect();
                let mut out = json!({
                    "type": node.node_type,
                    "name": node.name,
                    "parameters": parameters,
                    "flow": flow,
                    "extras": {
                        "position": node.extras.position,
                        "graph": node.extras.owning_graph,
                    },
                });
                if let Some(configuration) = &node.configuration {
                    out["configuration"] = configuration.clone();
                }
                out
            })
            .collect();
        let variables: Vec<serde_json::Value> = self
            .variables
            .iter()
            .map(|var| {
                json!({
                    "name": var.name,
                    "type": var.ty().name(),
                    "initialValue": var.initial().to_json(),
                })
            })
            .collect();
        json!({ "behaviorNodes": nodes, "variables": variables })
    }
}
