//! # Scene Snapshot Codec
//!
//! Deterministic binary encoding of a [`SceneStore`]. The snapshot is the
//! transfer format between contexts: the loader encodes once, the render
//! side decodes into its own store, and no locks are shared.
//!
//! ## Layout (bit-exact, little-endian)
//!
//! ```text
//! [magic "LSCN": 4 bytes][version: u32 = 1][entity count: u32]
//! per entity: [mask: u64][components present in ascending ID order]
//! ```
//!
//! Component payloads are fixed-size field-by-field LE writes, so equal
//! stores encode to byte-identical snapshots on every platform.

use crate::components::{
    Collider, Component, MaterialRef, MeshRef, Parent, RigidBody, Transform,
};
use crate::error::{SceneError, SceneResult};
use crate::store::SceneStore;

/// Magic bytes at the start of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"LSCN";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Encodes a store into its snapshot bytes.
#[must_use]
pub fn encode(store: &SceneStore) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(&SNAPSHOT_MAGIC);
    w.u32(SNAPSHOT_VERSION);
    w.u32(store.len() as u32);

    let (transforms, mesh_refs, material_refs, colliders, bodies, parents) = store.columns();
    for (index, &mask) in store.masks().iter().enumerate() {
        w.u64(mask);
        if mask & Transform::mask() != 0 {
            let t = transforms.as_slice()[index];
            w.vec3(t.translation);
            w.vec4(t.rotation);
            w.vec3(t.scale);
        }
        if mask & MeshRef::mask() != 0 {
            w.u32(mesh_refs.as_slice()[index].mesh);
        }
        if mask & MaterialRef::mask() != 0 {
            w.u32(material_refs.as_slice()[index].material);
        }
        if mask & Collider::mask() != 0 {
            let c = colliders.as_slice()[index];
            w.u32(c.kind);
            w.vec3(c.params);
        }
        if mask & RigidBody::mask() != 0 {
            w.u32(bodies.as_slice()[index].kind);
        }
        if mask & Parent::mask() != 0 {
            w.u32(parents.as_slice()[index].parent);
        }
    }
    w.buffer
}

/// Decodes snapshot bytes back into a store.
///
/// # Errors
///
/// [`SceneError::MalformedSnapshot`] for a bad magic, unsupported version,
/// truncated stream, or trailing bytes.
pub fn decode(bytes: &[u8]) -> SceneResult<SceneStore> {
    let mut r = Reader::new(bytes);

    let magic = r.bytes(4)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(SceneError::MalformedSnapshot(format!(
            "bad magic {magic:?}"
        )));
    }
    let version = r.u32()?;
    if version != SNAPSHOT_VERSION {
        return Err(SceneError::MalformedSnapshot(format!(
            "unsupported version {version}"
        )));
    }

    let count = r.u32()? as usize;
    // Every entity occupies at least its mask in the stream; a count the
    // remaining bytes cannot back is garbage, not an allocation request.
    let mask_size = std::mem::size_of::<u64>();
    if count > r.remaining() / mask_size {
        return Err(SceneError::MalformedSnapshot(format!(
            "entity count {count} exceeds stream capacity"
        )));
    }
    let mut store = SceneStore::with_capacity(count);
    for index in 0..count {
        let mask = r.u64()?;
        let transform = if mask & Transform::mask() != 0 {
            Transform {
                translation: r.vec3()?,
                rotation: r.vec4()?,
                scale: r.vec3()?,
            }
        } else {
            Transform::default()
        };
        let mesh_ref = if mask & MeshRef::mask() != 0 {
            MeshRef { mesh: r.u32()? }
        } else {
            MeshRef::default()
        };
        let material_ref = if mask & MaterialRef::mask() != 0 {
            MaterialRef { material: r.u32()? }
        } else {
            MaterialRef::default()
        };
        let collider = if mask & Collider::mask() != 0 {
            Collider {
                kind: r.u32()?,
                params: r.vec3()?,
            }
        } else {
            Collider::default()
        };
        let body = if mask & RigidBody::mask() != 0 {
            RigidBody { kind: r.u32()? }
        } else {
            RigidBody::default()
        };
        let parent = if mask & Parent::mask() != 0 {
            Parent { parent: r.u32()? }
        } else {
            Parent::default()
        };
        store.restore_entity(
            index,
            mask,
            transform,
            mesh_ref,
            material_ref,
            collider,
            body,
            parent,
        );
    }

    if r.remaining() != 0 {
        return Err(SceneError::MalformedSnapshot(format!(
            "{} trailing bytes",
            r.remaining()
        )));
    }
    Ok(store)
}

#[derive(Default)]
struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    #[inline]
    fn bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    #[inline]
    fn u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn vec3(&mut self, value: [f32; 3]) {
        for component in value {
            self.f32(component);
        }
    }

    #[inline]
    fn vec4(&mut self, value: [f32; 4]) {
        for component in value {
            self.f32(component);
        }
    }
}

struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    #[inline]
    const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn bytes(&mut self, len: usize) -> SceneResult<&'a [u8]> {
        let end = self.position + len;
        let slice = self.buffer.get(self.position..end).ok_or_else(|| {
            SceneError::MalformedSnapshot(format!("truncated at byte {}", self.position))
        })?;
        self.position = end;
        Ok(slice)
    }

    fn u32(&mut self) -> SceneResult<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> SceneResult<u64> {
        let bytes = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn f32(&mut self) -> SceneResult<f32> {
        let bytes = self.bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn vec3(&mut self) -> SceneResult<[f32; 3]> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    fn vec4(&mut self) -> SceneResult<[f32; 4]> {
        Ok([self.f32()?, self.f32()?, self.f32()?, self.f32()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use lumen_asset::{ColliderShape, Document, Node, PhysicsBodyKind};

    fn sample_store() -> SceneStore {
        let mut doc = Document::default();
        doc.nodes.push(Node {
            name: "a".into(),
            translation: [1.0, 2.0, 3.0],
            children: vec![1],
            ..Node::default()
        });
        doc.nodes.push(Node {
            name: "b".into(),
            collider: Some(ColliderShape::Capsule {
                radius: 0.3,
                height: 1.8,
            }),
            physics_body: Some(PhysicsBodyKind::Kinematic),
            ..Node::default()
        });
        SceneStore::build(&doc).unwrap()
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = sample_store();
        let restored = decode(&encode(&store)).unwrap();

        assert_eq!(restored.len(), store.len());
        for index in 0..store.len() {
            let entity = EntityId(index as u32);
            assert_eq!(restored.mask(entity), store.mask(entity));
            assert_eq!(restored.transform(entity), store.transform(entity));
            assert_eq!(restored.collider(entity), store.collider(entity));
            assert_eq!(restored.parent(entity), store.parent(entity));
        }
    }

    #[test]
    fn test_equal_stores_encode_identically() {
        let a = encode(&sample_store());
        let b = encode(&sample_store());
        assert_eq!(a, b);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = encode(&sample_store());
        bytes[..4].copy_from_slice(b"XSCN");
        assert!(matches!(
            decode(&bytes),
            Err(SceneError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_truncated_snapshot_rejected() {
        let bytes = encode(&sample_store());
        assert!(matches!(
            decode(&bytes[..bytes.len() - 3]),
            Err(SceneError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_absurd_entity_count_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 3]);
        assert!(matches!(
            decode(&bytes),
            Err(SceneError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(&sample_store());
        bytes.push(0);
        assert!(matches!(
            decode(&bytes),
            Err(SceneError::MalformedSnapshot(_))
        ));
    }
}
