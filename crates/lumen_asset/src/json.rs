//! # Raw glTF JSON Model
//!
//! Serde mirror of the glTF 2.0 JSON document, kept as close to the wire
//! shape as possible. Lowering to the validated [`Document`](crate::Document)
//! happens in the parser, not here.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Root of the raw glTF JSON document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    /// Mandatory asset header.
    pub asset: RawAssetInfo,
    /// Index of the default scene.
    #[serde(default)]
    pub scene: Option<usize>,
    /// Scene list.
    #[serde(default)]
    pub scenes: Vec<RawScene>,
    /// Node list.
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    /// Mesh list.
    #[serde(default)]
    pub meshes: Vec<RawMesh>,
    /// Material list.
    #[serde(default)]
    pub materials: Vec<RawMaterial>,
    /// Texture list.
    #[serde(default)]
    pub textures: Vec<RawTexture>,
    /// Image list.
    #[serde(default)]
    pub images: Vec<RawImage>,
    /// Accessor list.
    #[serde(default)]
    pub accessors: Vec<RawAccessor>,
    /// Buffer view list.
    #[serde(default)]
    pub buffer_views: Vec<RawBufferView>,
    /// Buffer list.
    #[serde(default)]
    pub buffers: Vec<RawBuffer>,
    /// Animation list.
    #[serde(default)]
    pub animations: Vec<RawAnimation>,
    /// Root-level extensions, including the behavior graph.
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

/// The `asset` header object.
#[derive(Debug, Default, Deserialize)]
pub struct RawAssetInfo {
    /// glTF version string; must start with "2".
    #[serde(default)]
    pub version: String,
}

/// A scene: a list of root node indices.
#[derive(Debug, Default, Deserialize)]
pub struct RawScene {
    /// Optional scene name.
    #[serde(default)]
    pub name: Option<String>,
    /// Root node indices.
    #[serde(default)]
    pub nodes: Vec<usize>,
}

/// A scene node.
#[derive(Debug, Default, Deserialize)]
pub struct RawNode {
    /// Optional node name.
    #[serde(default)]
    pub name: Option<String>,
    /// Translation, defaults to the origin.
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Rotation quaternion (x, y, z, w), defaults to identity.
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    /// Scale, defaults to one.
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    /// Mesh index.
    #[serde(default)]
    pub mesh: Option<usize>,
    /// Child node indices.
    #[serde(default)]
    pub children: Vec<usize>,
    /// Node-level extensions (colliders, physics bodies).
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

/// A mesh: a list of primitives.
#[derive(Debug, Default, Deserialize)]
pub struct RawMesh {
    /// Optional mesh name.
    #[serde(default)]
    pub name: Option<String>,
    /// Primitive list.
    #[serde(default)]
    pub primitives: Vec<RawPrimitive>,
}

/// One drawable primitive of a mesh.
#[derive(Debug, Default, Deserialize)]
pub struct RawPrimitive {
    /// Attribute name to accessor index ("POSITION", "NORMAL", ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    /// Index accessor.
    #[serde(default)]
    pub indices: Option<usize>,
    /// Material index.
    #[serde(default)]
    pub material: Option<usize>,
}

/// A material (metallic-roughness subset).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterial {
    /// Optional material name.
    #[serde(default)]
    pub name: Option<String>,
    /// PBR metallic-roughness parameters.
    #[serde(default)]
    pub pbr_metallic_roughness: Option<RawPbr>,
    /// Double-sided rendering flag.
    #[serde(default)]
    pub double_sided: bool,
}

/// PBR metallic-roughness parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPbr {
    /// Base color RGBA factor.
    #[serde(default)]
    pub base_color_factor: Option<[f32; 4]>,
    /// Base color texture reference.
    #[serde(default)]
    pub base_color_texture: Option<RawTextureRef>,
    /// Metallic factor.
    #[serde(default)]
    pub metallic_factor: Option<f32>,
    /// Roughness factor.
    #[serde(default)]
    pub roughness_factor: Option<f32>,
}

/// A texture reference inside a material.
#[derive(Debug, Default, Deserialize)]
pub struct RawTextureRef {
    /// Texture index.
    pub index: usize,
}

/// A texture: a source image plus sampling state.
#[derive(Debug, Default, Deserialize)]
pub struct RawTexture {
    /// Optional texture name.
    #[serde(default)]
    pub name: Option<String>,
    /// Source image index.
    #[serde(default)]
    pub source: Option<usize>,
}

/// An image, either by URI or embedded in a buffer view.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    /// Optional image name.
    #[serde(default)]
    pub name: Option<String>,
    /// External or `data:` URI.
    #[serde(default)]
    pub uri: Option<String>,
    /// Buffer view holding the encoded image.
    #[serde(default)]
    pub buffer_view: Option<usize>,
    /// MIME type of the encoded image.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A typed view over buffer bytes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccessor {
    /// Buffer view index; absent means implicit zeros.
    #[serde(default)]
    pub buffer_view: Option<usize>,
    /// Byte offset into the buffer view.
    #[serde(default)]
    pub byte_offset: usize,
    /// Component type code (5120..5126).
    pub component_type: u32,
    /// Element count.
    pub count: usize,
    /// Element type string ("SCALAR", "VEC3", ...).
    #[serde(rename = "type")]
    pub element_type: String,
}

/// A byte range of a buffer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBufferView {
    /// Buffer index.
    pub buffer: usize,
    /// Byte offset into the buffer.
    #[serde(default)]
    pub byte_offset: usize,
    /// Byte length of the view.
    pub byte_length: usize,
    /// Optional interleaving stride.
    #[serde(default)]
    pub byte_stride: Option<usize>,
}

/// A binary buffer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBuffer {
    /// External or `data:` URI; absent means the GLB BIN chunk.
    #[serde(default)]
    pub uri: Option<String>,
    /// Byte length of the buffer.
    pub byte_length: usize,
}

/// A keyframe animation.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnimation {
    /// Optional animation name.
    #[serde(default)]
    pub name: Option<String>,
    /// Channel list.
    #[serde(default)]
    pub channels: Vec<RawAnimationChannel>,
    /// Sampler list.
    #[serde(default)]
    pub samplers: Vec<RawAnimationSampler>,
}

/// One animation channel: sampler applied to a node property.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnimationChannel {
    /// Sampler index within this animation.
    pub sampler: usize,
    /// Target node and property.
    pub target: RawAnimationTarget,
}

/// The node property an animation channel drives.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnimationTarget {
    /// Target node index.
    #[serde(default)]
    pub node: Option<usize>,
    /// Target property path ("translation", "rotation", "scale", "weights").
    pub path: String,
}

/// Keyframe input/output accessors for one channel.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnimationSampler {
    /// Keyframe times accessor.
    pub input: usize,
    /// Keyframe values accessor.
    pub output: usize,
    /// Interpolation mode.
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
}

fn default_interpolation() -> String {
    "LINEAR".to_owned()
}
