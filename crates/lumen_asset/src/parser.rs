//! # Asset Parser
//!
//! Entry point for turning a byte stream into a validated [`Document`].
//!
//! The pipeline is: sniff the container ([`glb::is_binary`]), split chunks
//! if binary, deserialize the raw JSON model, lower it to the document
//! model (resolving embedded buffers and node extensions), then validate
//! every cross-list index so downstream code can trust lookups.

use std::sync::Arc;

use base64::Engine as _;

use crate::behavior::{BehaviorExtension, ParamValue, BEHAVIOR_EXTENSION};
use crate::document::{
    Accessor, Animation, AnimationChannel, AnimationPath, AnimationSampler, Buffer, BufferData,
    BufferView, ColliderShape, ComponentType, Document, ElementType, Image, ImageSource,
    Interpolation, Material, Mesh, Node, PhysicsBodyKind, Primitive, Scene, Texture,
};
use crate::error::{AssetError, AssetResult, RefKind};
use crate::glb;
use crate::json::{RawDocument, RawNode};

/// Node extension key for collider shapes.
pub const COLLIDER_EXTENSION: &str = "OMI_collider";

/// Node extension key for physics bodies.
pub const PHYSICS_BODY_EXTENSION: &str = "OMI_physics_body";

/// Parses a GLB container or a plain glTF JSON document.
///
/// # Errors
///
/// [`AssetError::MalformedAsset`] for container, JSON, or extension shape
/// problems; [`AssetError::UnresolvedReference`] for any dangling index
/// anywhere in the document, including the behavior graph.
pub fn parse(bytes: &[u8]) -> AssetResult<Document> {
    let (json_bytes, bin_chunk) = if glb::is_binary(bytes) {
        let chunks = glb::split(bytes)?;
        (chunks.json, chunks.bin)
    } else {
        (bytes.to_vec(), None)
    };

    let raw: RawDocument = serde_json::from_slice(&json_bytes)
        .map_err(|err| AssetError::MalformedAsset(format!("invalid document JSON: {err}")))?;

    if !raw.asset.version.starts_with('2') {
        return Err(AssetError::MalformedAsset(format!(
            "unsupported asset version {:?}",
            raw.asset.version
        )));
    }

    let document = lower(raw, bin_chunk)?;
    validate(&document)?;

    tracing::debug!(
        nodes = document.nodes.len(),
        meshes = document.meshes.len(),
        behavior_nodes = document.behavior.nodes.len(),
        "parsed document"
    );
    Ok(document)
}

// ============================================================================
// Lowering
// ============================================================================

fn lower(raw: RawDocument, bin_chunk: Option<Vec<u8>>) -> AssetResult<Document> {
    let mut doc = Document::default();
    doc.default_scene = raw.scene;

    for scene in raw.scenes {
        doc.scenes.push(Scene {
            name: scene.name,
            nodes: scene.nodes,
        });
    }

    for (index, node) in raw.nodes.into_iter().enumerate() {
        let lowered = lower_node(node, index, &mut doc)?;
        doc.nodes.push(lowered);
    }

    for mesh in raw.meshes {
        doc.meshes.push(Mesh {
            name: mesh.name,
            primitives: mesh
                .primitives
                .into_iter()
                .map(|p| Primitive {
                    attributes: p.attributes,
                    indices: p.indices,
                    material: p.material,
                })
                .collect(),
        });
    }

    for material in raw.materials {
        let pbr = material.pbr_metallic_roughness.unwrap_or_default();
        doc.materials.push(Material {
            name: material.name,
            base_color: pbr.base_color_factor.unwrap_or([1.0; 4]),
            base_color_texture: pbr.base_color_texture.map(|t| t.index),
            metallic: pbr.metallic_factor.unwrap_or(1.0),
            roughness: pbr.roughness_factor.unwrap_or(1.0),
            double_sided: material.double_sided,
        });
    }

    for texture in raw.textures {
        doc.textures.push(Texture {
            name: texture.name,
            source: texture.source,
        });
    }

    for (index, image) in raw.images.into_iter().enumerate() {
        let source = match (image.uri, image.buffer_view) {
            (Some(uri), None) => ImageSource::Uri(uri),
            (None, Some(view)) => ImageSource::BufferView(view),
            (Some(_), Some(_)) => {
                return Err(AssetError::MalformedAsset(format!(
                    "image {index} declares both uri and bufferView"
                )));
            }
            (None, None) => {
                return Err(AssetError::MalformedAsset(format!(
                    "image {index} has no byte source"
                )));
            }
        };
        doc.images.push(Image {
            name: image.name,
            source,
            mime_type: image.mime_type,
        });
    }

    for accessor in raw.accessors {
        doc.accessors.push(Accessor {
            buffer_view: accessor.buffer_view,
            byte_offset: accessor.byte_offset,
            component_type: ComponentType::from_code(accessor.component_type)?,
            count: accessor.count,
            element_type: ElementType::from_name(&accessor.element_type)?,
        });
    }

    for view in raw.buffer_views {
        doc.buffer_views.push(BufferView {
            buffer: view.buffer,
            byte_offset: view.byte_offset,
            byte_length: view.byte_length,
            byte_stride: view.byte_stride,
        });
    }

    // The BIN chunk backs the first buffer without a URI; any further
    // uri-less buffer is malformed.
    let mut bin_chunk = bin_chunk;
    for (index, buffer) in raw.buffers.into_iter().enumerate() {
        let data = match buffer.uri {
            Some(uri) if uri.starts_with("data:") => {
                BufferData::Binary(decode_data_uri(&uri, index)?)
            }
            Some(uri) => BufferData::External {
                uri,
                byte_length: buffer.byte_length,
            },
            None => match bin_chunk.take() {
                Some(bytes) => {
                    if bytes.len() < buffer.byte_length {
                        return Err(AssetError::MalformedAsset(format!(
                            "BIN chunk shorter than buffer {index}: {} < {}",
                            bytes.len(),
                            buffer.byte_length
                        )));
                    }
                    BufferData::Binary(Arc::from(bytes))
                }
                None => {
                    return Err(AssetError::MalformedAsset(format!(
                        "buffer {index} has no uri and no BIN chunk backs it"
                    )));
                }
            },
        };
        doc.buffers.push(Buffer { data });
    }

    for animation in raw.animations {
        let mut lowered = Animation {
            name: animation.name,
            ..Animation::default()
        };
        for channel in animation.channels {
            lowered.channels.push(AnimationChannel {
                sampler: channel.sampler,
                node: channel.target.node,
                path: AnimationPath::from_name(&channel.target.path)?,
            });
        }
        for sampler in animation.samplers {
            lowered.samplers.push(AnimationSampler {
                input: sampler.input,
                output: sampler.output,
                interpolation: Interpolation::from_name(&sampler.interpolation)?,
            });
        }
        doc.animations.push(lowered);
    }

    if let Some(ext) = raw.extensions.get(BEHAVIOR_EXTENSION) {
        doc.behavior = BehaviorExtension::from_json(ext)?;
    }

    Ok(doc)
}

fn lower_node(raw: RawNode, index: usize, doc: &mut Document) -> AssetResult<Node> {
    let name = match raw.name {
        Some(name) => name,
        None => doc.generate_name("node"),
    };
    let mut node = Node {
        name,
        translation: raw.translation.unwrap_or([0.0; 3]),
        rotation: raw.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]),
        scale: raw.scale.unwrap_or([1.0; 3]),
        mesh: raw.mesh,
        children: raw.children,
        collider: None,
        physics_body: None,
    };

    if let Some(ext) = raw.extensions.get(COLLIDER_EXTENSION) {
        node.collider = Some(lower_collider(ext, index)?);
    }
    if let Some(ext) = raw.extensions.get(PHYSICS_BODY_EXTENSION) {
        node.physics_body = Some(lower_physics_body(ext, index)?);
    }
    Ok(node)
}

fn lower_collider(ext: &serde_json::Value, node: usize) -> AssetResult<ColliderShape> {
    let malformed = |detail: &str| {
        AssetError::MalformedAsset(format!("node {node} collider extension: {detail}"))
    };
    let shape = ext
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| malformed("missing shape type"))?;
    #[allow(clippy::cast_possible_truncation)]
    let float = |key: &str| -> AssetResult<f32> {
        ext.get(key)
            .and_then(serde_json::Value::as_f64)
            .map(|f| f as f32)
            .ok_or_else(|| malformed(&format!("missing {key}")))
    };
    match shape {
        "box" => {
            let size = ext
                .get("size")
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| malformed("missing size"))?;
            #[allow(clippy::cast_possible_truncation)]
            let size: Vec<f32> = size
                .iter()
                .filter_map(serde_json::Value::as_f64)
                .map(|f| f as f32)
                .collect();
            let [x, y, z] = size[..] else {
                return Err(malformed("size must have three components"));
            };
            Ok(ColliderShape::Box {
                half_extents: [x / 2.0, y / 2.0, z / 2.0],
            })
        }
        "sphere" => Ok(ColliderShape::Sphere {
            radius: float("radius")?,
        }),
        "capsule" => Ok(ColliderShape::Capsule {
            radius: float("radius")?,
            height: float("height")?,
        }),
        other => Err(malformed(&format!("unknown shape {other:?}"))),
    }
}

fn lower_physics_body(ext: &serde_json::Value, node: usize) -> AssetResult<PhysicsBodyKind> {
    let kind = ext
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            AssetError::MalformedAsset(format!("node {node} physics body: missing type"))
        })?;
    match kind {
        "static" => Ok(PhysicsBodyKind::Static),
        "kinematic" => Ok(PhysicsBodyKind::Kinematic),
        "dynamic" | "rigid" => Ok(PhysicsBodyKind::Dynamic),
        other => Err(AssetError::MalformedAsset(format!(
            "node {node} physics body: unknown type {other:?}"
        ))),
    }
}

fn decode_data_uri(uri: &str, buffer: usize) -> AssetResult<Arc<[u8]>> {
    let payload = uri
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| {
            AssetError::MalformedAsset(format!("buffer {buffer} data uri is not base64"))
        })?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| {
            AssetError::MalformedAsset(format!("buffer {buffer} base64 payload: {err}"))
        })?;
    Ok(Arc::from(bytes))
}

// ============================================================================
// Validation
// ============================================================================

/// Checks every cross-list index in the document, including the behavior
/// graph's node, variable, and path references, and behavior node name
/// uniqueness.
pub fn validate(doc: &Document) -> AssetResult<()> {
    let check = |kind: RefKind, index: usize, len: usize| -> AssetResult<()> {
        if index < len {
            Ok(())
        } else {
            Err(AssetError::unresolved(kind, index))
        }
    };

    if let Some(scene) = doc.default_scene {
        check(RefKind::Scene, scene, doc.scenes.len())?;
    }
    for scene in &doc.scenes {
        for &node in &scene.nodes {
            check(RefKind::Node, node, doc.nodes.len())?;
        }
    }

    for node in &doc.nodes {
        if let Some(mesh) = node.mesh {
            check(RefKind::Mesh, mesh, doc.meshes.len())?;
        }
        for &child in &node.children {
            check(RefKind::Node, child, doc.nodes.len())?;
        }
    }

    for mesh in &doc.meshes {
        for primitive in &mesh.primitives {
            for &accessor in primitive.attributes.values() {
                check(RefKind::Accessor, accessor, doc.accessors.len())?;
            }
            if let Some(indices) = primitive.indices {
                check(RefKind::Accessor, indices, doc.accessors.len())?;
            }
            if let Some(material) = primitive.material {
                check(RefKind::Material, material, doc.materials.len())?;
            }
        }
    }

    for material in &doc.materials {
        if let Some(texture) = material.base_color_texture {
            check(RefKind::Texture, texture, doc.textures.len())?;
        }
    }
    for texture in &doc.textures {
        if let Some(source) = texture.source {
            check(RefKind::Image, source, doc.images.len())?;
        }
    }
    for image in &doc.images {
        if let ImageSource::BufferView(view) = image.source {
            check(RefKind::BufferView, view, doc.buffer_views.len())?;
        }
    }

    for accessor in &doc.accessors {
        if let Some(view) = accessor.buffer_view {
            check(RefKind::BufferView, view, doc.buffer_views.len())?;
        }
    }
    for view in &doc.buffer_views {
        check(RefKind::Buffer, view.buffer, doc.buffers.len())?;
    }

    for animation in &doc.animations {
        for channel in &animation.channels {
            if channel.sampler >= animation.samplers.len() {
                return Err(AssetError::MalformedAsset(format!(
                    "animation channel sampler {} out of range",
                    channel.sampler
                )));
            }
            if let Some(node) = channel.node {
                check(RefKind::Node, node, doc.nodes.len())?;
            }
        }
        for sampler in &animation.samplers {
            check(RefKind::Accessor, sampler.input, doc.accessors.len())?;
            check(RefKind::Accessor, sampler.output, doc.accessors.len())?;
        }
    }

    validate_behavior(doc)
}

fn validate_behavior(doc: &Document) -> AssetResult<()> {
    let behavior = &doc.behavior;
    let node_count = behavior.nodes.len();

    for (index, node) in behavior.nodes.iter().enumerate() {
        if behavior.nodes[..index].iter().any(|n| n.name == node.name) {
            return Err(AssetError::MalformedAsset(format!(
                "duplicate behavior node name {:?}",
                node.name
            )));
        }

        for &target in node.flow.values() {
            if target >= node_count {
                return Err(AssetError::unresolved(RefKind::BehaviorNode, target));
            }
        }
        for param in node.parameters.values() {
            match param {
                ParamValue::Link { node: target, .. } => {
                    if *target >= node_count {
                        return Err(AssetError::unresolved(RefKind::BehaviorNode, *target));
                    }
                }
                ParamValue::Variable(variable) => {
                    if *variable >= behavior.variables.len() {
                        return Err(AssetError::unresolved(RefKind::Variable, *variable));
                    }
                }
                ParamValue::Path(path) => {
                    if path.node >= doc.nodes.len() {
                        return Err(AssetError::unresolved(RefKind::Node, path.node));
                    }
                }
                ParamValue::Constant(_) => {}
            }
        }
    }
    Ok(())
}
