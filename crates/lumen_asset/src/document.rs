//! # Document Model
//!
//! The validated, in-memory representation of one loaded asset.
//!
//! ## Index discipline
//!
//! Every cross-list reference is a plain index into the same `Document`
//! instance - never a live pointer. Lists are append-only for the lifetime
//! of one load session; a reload produces a whole new `Document` and the
//! old one is discarded, so indices handed out against a given document
//! stay valid until that document is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::behavior::{BehaviorExtension, BehaviorNode, Value, Variable, VariableType};
use crate::error::{AssetError, AssetResult, RefKind};

/// A scene: the set of root nodes to instantiate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Optional scene name.
    pub name: Option<String>,
    /// Root node indices.
    pub nodes: Vec<usize>,
}

/// Collider shape attached to a node (from the `OMI_collider` extension).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Axis-aligned box, by half extents.
    Box {
        /// Half extents along x/y/z.
        half_extents: [f32; 3],
    },
    /// Sphere, by radius.
    Sphere {
        /// Sphere radius.
        radius: f32,
    },
    /// Capsule, by radius and total height.
    Capsule {
        /// Capsule radius.
        radius: f32,
        /// Capsule height including caps.
        height: f32,
    },
}

/// Physics body kind attached to a node (from the `OMI_physics_body` extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsBodyKind {
    /// Never moves.
    Static,
    /// Moved by the engine, not by forces.
    Kinematic,
    /// Fully simulated.
    Dynamic,
}

/// A scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name; generated names use the document's serial counter.
    pub name: String,
    /// Local translation.
    pub translation: [f32; 3],
    /// Local rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// Local scale.
    pub scale: [f32; 3],
    /// Mesh index, if this node is drawable.
    pub mesh: Option<usize>,
    /// Child node indices.
    pub children: Vec<usize>,
    /// Collider shape, if any.
    pub collider: Option<ColliderShape>,
    /// Physics body kind, if any.
    pub physics_body: Option<PhysicsBodyKind>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            mesh: None,
            children: Vec::new(),
            collider: None,
            physics_body: None,
        }
    }
}

/// One drawable primitive of a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    /// Attribute name to accessor index.
    pub attributes: BTreeMap<String, usize>,
    /// Index accessor.
    pub indices: Option<usize>,
    /// Material index.
    pub material: Option<usize>,
}

/// A mesh: a list of primitives sharing one name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Optional mesh name.
    pub name: Option<String>,
    /// Primitive list.
    pub primitives: Vec<Primitive>,
}

/// A material (metallic-roughness subset).
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Optional material name.
    pub name: Option<String>,
    /// Base color RGBA factor.
    pub base_color: [f32; 4],
    /// Base color texture index.
    pub base_color_texture: Option<usize>,
    /// Metallic factor.
    pub metallic: f32,
    /// Roughness factor.
    pub roughness: f32,
    /// Double-sided rendering flag.
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0; 4],
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            double_sided: false,
        }
    }
}

/// A texture: a reference to a source image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    /// Optional texture name.
    pub name: Option<String>,
    /// Source image index.
    pub source: Option<usize>,
}

/// Where an image's encoded bytes live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// External URI, resolved by the loader context.
    Uri(String),
    /// Embedded in a buffer view.
    BufferView(usize),
}

/// An encoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Optional image name.
    pub name: Option<String>,
    /// Encoded byte source.
    pub source: ImageSource,
    /// MIME type, when known.
    pub mime_type: Option<String>,
}

/// Component type of accessor elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// `i8`
    I8,
    /// `u8`
    U8,
    /// `i16`
    I16,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `f32`
    F32,
}

impl ComponentType {
    /// Maps a glTF component type code.
    pub fn from_code(code: u32) -> AssetResult<Self> {
        match code {
            5120 => Ok(Self::I8),
            5121 => Ok(Self::U8),
            5122 => Ok(Self::I16),
            5123 => Ok(Self::U16),
            5125 => Ok(Self::U32),
            5126 => Ok(Self::F32),
            other => Err(AssetError::MalformedAsset(format!(
                "unknown accessor component type {other}"
            ))),
        }
    }

    /// Byte size of one component.
    #[inline]
    #[must_use]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// Element arity of accessor elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// One component.
    Scalar,
    /// Two components.
    Vec2,
    /// Three components.
    Vec3,
    /// Four components.
    Vec4,
    /// 4x4 matrix.
    Mat4,
}

impl ElementType {
    /// Maps a glTF element type string.
    pub fn from_name(name: &str) -> AssetResult<Self> {
        match name {
            "SCALAR" => Ok(Self::Scalar),
            "VEC2" => Ok(Self::Vec2),
            "VEC3" => Ok(Self::Vec3),
            "VEC4" => Ok(Self::Vec4),
            "MAT4" => Ok(Self::Mat4),
            other => Err(AssetError::MalformedAsset(format!(
                "unknown accessor element type {other:?}"
            ))),
        }
    }

    /// Number of components per element.
    #[inline]
    #[must_use]
    pub const fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }
}

/// A typed view over buffer bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accessor {
    /// Buffer view index; `None` means implicit zeros.
    pub buffer_view: Option<usize>,
    /// Byte offset into the buffer view.
    pub byte_offset: usize,
    /// Component type.
    pub component_type: ComponentType,
    /// Element count.
    pub count: usize,
    /// Element arity.
    pub element_type: ElementType,
}

impl Accessor {
    /// Byte size of one element.
    #[inline]
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.component_type.byte_size() * self.element_type.component_count()
    }
}

/// A byte range of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferView {
    /// Buffer index.
    pub buffer: usize,
    /// Byte offset into the buffer.
    pub byte_offset: usize,
    /// Byte length of the view.
    pub byte_length: usize,
    /// Optional interleaving stride.
    pub byte_stride: Option<usize>,
}

/// Where a buffer's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferData {
    /// Bytes resolved at parse time (GLB BIN chunk or a decoded `data:` URI).
    Binary(Arc<[u8]>),
    /// External URI the loader context must fetch before accessor access.
    External {
        /// The unresolved URI.
        uri: String,
        /// Declared byte length.
        byte_length: usize,
    },
}

/// A binary buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    /// The buffer bytes or their unresolved location.
    pub data: BufferData,
}

/// The node property an animation channel drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPath {
    /// Node translation.
    Translation,
    /// Node rotation.
    Rotation,
    /// Node scale.
    Scale,
    /// Morph target weights.
    Weights,
}

impl AnimationPath {
    /// Maps a glTF target path string.
    pub fn from_name(name: &str) -> AssetResult<Self> {
        match name {
            "translation" => Ok(Self::Translation),
            "rotation" => Ok(Self::Rotation),
            "scale" => Ok(Self::Scale),
            "weights" => Ok(Self::Weights),
            other => Err(AssetError::MalformedAsset(format!(
                "unknown animation path {other:?}"
            ))),
        }
    }
}

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Step (nearest) interpolation.
    Step,
    /// Cubic spline interpolation.
    CubicSpline,
}

impl Interpolation {
    /// Maps a glTF interpolation string.
    pub fn from_name(name: &str) -> AssetResult<Self> {
        match name {
            "LINEAR" => Ok(Self::Linear),
            "STEP" => Ok(Self::Step),
            "CUBICSPLINE" => Ok(Self::CubicSpline),
            other => Err(AssetError::MalformedAsset(format!(
                "unknown interpolation {other:?}"
            ))),
        }
    }
}

/// One animation channel: a sampler applied to a node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationChannel {
    /// Sampler index within the owning animation.
    pub sampler: usize,
    /// Target node index.
    pub node: Option<usize>,
    /// Target property.
    pub path: AnimationPath,
}

/// Keyframe input/output accessors for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSampler {
    /// Keyframe times accessor.
    pub input: usize,
    /// Keyframe values accessor.
    pub output: usize,
    /// Interpolation mode.
    pub interpolation: Interpolation,
}

/// A keyframe animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    /// Optional animation name.
    pub name: Option<String>,
    /// Channel list.
    pub channels: Vec<AnimationChannel>,
    /// Sampler list.
    pub samplers: Vec<AnimationSampler>,
}

/// The validated, in-memory representation of one loaded asset.
///
/// Created once per load by [`parse`](crate::parse) and replaced wholesale
/// on the next load. Mutation is limited to node transforms (behavior graph
/// writes) and the behavior extension's public mutation API below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Scene list.
    pub scenes: Vec<Scene>,
    /// Default scene index.
    pub default_scene: Option<usize>,
    /// Node list.
    pub nodes: Vec<Node>,
    /// Mesh list.
    pub meshes: Vec<Mesh>,
    /// Material list.
    pub materials: Vec<Material>,
    /// Texture list.
    pub textures: Vec<Texture>,
    /// Image list.
    pub images: Vec<Image>,
    /// Accessor list.
    pub accessors: Vec<Accessor>,
    /// Buffer view list.
    pub buffer_views: Vec<BufferView>,
    /// Buffer list.
    pub buffers: Vec<Buffer>,
    /// Animation list.
    pub animations: Vec<Animation>,
    /// Behavior graph extension.
    pub behavior: BehaviorExtension,
    /// Monotonic serial for generated names; never reset within a session.
    name_serial: u64,
}

impl Document {
    /// Looks up a node, mapping out-of-range to [`AssetError::UnresolvedReference`].
    pub fn node(&self, index: usize) -> AssetResult<&Node> {
        self.nodes
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Node, index))
    }

    /// Mutable node lookup with the same error mapping.
    pub fn node_mut(&mut self, index: usize) -> AssetResult<&mut Node> {
        self.nodes
            .get_mut(index)
            .ok_or(AssetError::unresolved(RefKind::Node, index))
    }

    /// Looks up a mesh.
    pub fn mesh(&self, index: usize) -> AssetResult<&Mesh> {
        self.meshes
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Mesh, index))
    }

    /// Looks up an accessor.
    pub fn accessor(&self, index: usize) -> AssetResult<&Accessor> {
        self.accessors
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Accessor, index))
    }

    /// Looks up a buffer view.
    pub fn buffer_view(&self, index: usize) -> AssetResult<&BufferView> {
        self.buffer_views
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::BufferView, index))
    }

    /// Looks up a buffer.
    pub fn buffer(&self, index: usize) -> AssetResult<&Buffer> {
        self.buffers
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Buffer, index))
    }

    /// Looks up an image.
    pub fn image(&self, index: usize) -> AssetResult<&Image> {
        self.images
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Image, index))
    }

    /// Looks up a behavior node.
    pub fn behavior_node(&self, index: usize) -> AssetResult<&BehaviorNode> {
        self.behavior
            .nodes
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::BehaviorNode, index))
    }

    /// Looks up a behavior variable.
    pub fn variable(&self, index: usize) -> AssetResult<&Variable> {
        self.behavior
            .variables
            .get(index)
            .ok_or(AssetError::unresolved(RefKind::Variable, index))
    }

    /// Takes the next generated-name serial.
    ///
    /// The counter only moves forward for the lifetime of this document, so
    /// generated names cannot collide within one load session.
    pub fn next_serial(&mut self) -> u64 {
        let serial = self.name_serial;
        self.name_serial += 1;
        serial
    }

    /// Generates a collision-proof name from a base string.
    pub fn generate_name(&mut self, base: &str) -> String {
        let serial = self.next_serial();
        format!("{base}#{serial}")
    }

    /// Appends a behavior node, returning its index.
    ///
    /// The node's name must be unique within the document; callers going
    /// through [`generate_name`](Self::generate_name) get that for free.
    pub fn create_behavior_node(&mut self, node: BehaviorNode) -> AssetResult<usize> {
        if self.behavior.nodes.iter().any(|n| n.name == node.name) {
            return Err(AssetError::MalformedAsset(format!(
                "duplicate behavior node name {:?}",
                node.name
            )));
        }
        self.behavior.nodes.push(node);
        Ok(self.behavior.nodes.len() - 1)
    }

    /// Removes a behavior node, detaching every link and flow edge that
    /// pointed at it. Indices of later nodes shift down by one, which is why
    /// removal is an editor-session operation, not a runtime one.
    pub fn remove_behavior_node(&mut self, index: usize) -> AssetResult<BehaviorNode> {
        if index >= self.behavior.nodes.len() {
            return Err(AssetError::unresolved(RefKind::BehaviorNode, index));
        }
        let removed = self.behavior.nodes.remove(index);
        for node in &mut self.behavior.nodes {
            node.flow.retain(|_, target| *target != index);
            node.parameters.retain(|_, param| !param.links_to(index));
            for target in node.flow.values_mut() {
                if *target > index {
                    *target -= 1;
                }
            }
            for param in node.parameters.values_mut() {
                param.shift_node_refs_above(index);
            }
        }
        Ok(removed)
    }

    /// Appends a variable of the given type with its zero initial value,
    /// returning the variable index.
    pub fn create_variable(&mut self, name: String, ty: VariableType) -> usize {
        self.behavior.variables.push(Variable::new(name, ty));
        self.behavior.variables.len() - 1
    }

    /// Changes a variable's type, resetting its initial value to the new
    /// type's zero value.
    pub fn set_variable_type(&mut self, index: usize, ty: VariableType) -> AssetResult<()> {
        let var = self
            .behavior
            .variables
            .get_mut(index)
            .ok_or(AssetError::unresolved(RefKind::Variable, index))?;
        var.set_type(ty);
        Ok(())
    }

    /// Splits the document into its node list (mutable) and behavior
    /// extension (shared). The interpreter walks the graph while writing
    /// node transforms, which needs both halves at once.
    pub fn nodes_and_behavior_mut(&mut self) -> (&mut [Node], &BehaviorExtension) {
        (&mut self.nodes, &self.behavior)
    }

    /// Initial runtime values for all variables, in declaration order.
    #[must_use]
    pub fn variable_defaults(&self) -> Vec<Value> {
        self.behavior
            .variables
            .iter()
            .map(|v| v.initial().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_never_collide() {
        let mut doc = Document::default();
        let a = doc.generate_name("node");
        let b = doc.generate_name("node");
        assert_ne!(a, b);
    }

    #[test]
    fn test_node_lookup_out_of_range() {
        let doc = Document::default();
        assert_eq!(
            doc.node(3).unwrap_err(),
            AssetError::unresolved(RefKind::Node, 3)
        );
    }

    #[test]
    fn test_remove_behavior_node_detaches_links() {
        use crate::behavior::ParamValue;

        let mut doc = Document::default();
        let mut a = BehaviorNode::new("lifecycle/on_start", "a");
        a.flow.insert("out".into(), 1);
        doc.create_behavior_node(a).unwrap();
        let mut b = BehaviorNode::new("debug/log", "b");
        b.parameters.insert(
            "message".into(),
            ParamValue::Link {
                node: 2,
                socket: "value".into(),
            },
        );
        doc.create_behavior_node(b).unwrap();
        doc.create_behavior_node(BehaviorNode::new("math/add", "c"))
            .unwrap();

        // Removing "c" (index 2) drops the link that pointed at it and
        // leaves the a -> b flow edge intact.
        doc.remove_behavior_node(2).unwrap();
        assert_eq!(doc.behavior.nodes[0].flow.get("out"), Some(&1));
        assert!(doc.behavior.nodes[1].parameters.is_empty());

        // Removing "a" (index 0) shifts "b" down to index 0.
        doc.remove_behavior_node(0).unwrap();
        assert_eq!(doc.behavior.nodes.len(), 1);
        assert_eq!(doc.behavior.nodes[0].name, "b");
    }

    #[test]
    fn test_duplicate_behavior_name_rejected() {
        let mut doc = Document::default();
        doc.create_behavior_node(BehaviorNode::new("debug/log", "x"))
            .unwrap();
        let err = doc
            .create_behavior_node(BehaviorNode::new("debug/log", "x"))
            .unwrap_err();
        assert!(matches!(err, AssetError::MalformedAsset(_)));
    }
}
