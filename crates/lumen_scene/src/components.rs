//! # Scene Components
//!
//! Pure-data components mirrored out of the document at build time. All
//! components are `Pod` so the snapshot codec can serialize columns as
//! raw bytes without a per-field walk.

use bytemuck::{Pod, Zeroable};

/// Marker trait for scene components.
///
/// Components must be `Copy + Pod + Zeroable + Default` so columns can be
/// pre-allocated and snapshotted bytewise. The `ID` indexes the per-entity
/// component bitmask.
pub trait Component: Copy + Pod + Zeroable + Default + Send + Sync + 'static {
    /// Unique bit position in the component mask (0-63).
    const ID: u8;

    /// The mask bit for this component type.
    #[inline]
    #[must_use]
    fn mask() -> u64 {
        1u64 << Self::ID
    }
}

/// Local TRS transform of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Transform {
    /// Local translation.
    pub translation: [f32; 3],
    /// Local rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// Local scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl Component for Transform {
    const ID: u8 = 0;
}

/// Reference to a mesh in the owning document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MeshRef {
    /// Mesh index.
    pub mesh: u32,
}

impl Component for MeshRef {
    const ID: u8 = 1;
}

/// Reference to the material of an entity's first primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialRef {
    /// Material index.
    pub material: u32,
}

impl Component for MaterialRef {
    const ID: u8 = 2;
}

/// Collider shape kinds, packed as a `u32` discriminant.
pub mod collider_kind {
    /// Box collider; params are half extents.
    pub const BOX: u32 = 0;
    /// Sphere collider; params\[0\] is the radius.
    pub const SPHERE: u32 = 1;
    /// Capsule collider; params\[0\] is the radius, params\[1\] the height.
    pub const CAPSULE: u32 = 2;
}

/// Collision shape of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Collider {
    /// Shape discriminant, one of [`collider_kind`].
    pub kind: u32,
    /// Shape parameters, meaning depends on `kind`.
    pub params: [f32; 3],
}

impl Component for Collider {
    const ID: u8 = 3;
}

/// Physics body kinds, packed as a `u32` discriminant.
pub mod body_kind {
    /// Never moves.
    pub const STATIC: u32 = 0;
    /// Moved by the engine, not by forces.
    pub const KINEMATIC: u32 = 1;
    /// Fully simulated.
    pub const DYNAMIC: u32 = 2;
}

/// Physics body attached to an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RigidBody {
    /// Body kind, one of [`body_kind`].
    pub kind: u32,
}

impl Component for RigidBody {
    const ID: u8 = 4;
}

/// Link to an entity's parent in the scene hierarchy. Root entities do not
/// carry this component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Parent {
    /// Parent entity id.
    pub parent: u32,
}

impl Component for Parent {
    const ID: u8 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ids_distinct() {
        let ids = [
            Transform::ID,
            MeshRef::ID,
            MaterialRef::ID,
            Collider::ID,
            RigidBody::ID,
            Parent::ID,
        ];
        let unique: std::collections::BTreeSet<u8> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_component_layouts_are_padding_free() {
        // Pod serialization depends on these exact sizes.
        assert_eq!(std::mem::size_of::<Transform>(), 40);
        assert_eq!(std::mem::size_of::<MeshRef>(), 4);
        assert_eq!(std::mem::size_of::<MaterialRef>(), 4);
        assert_eq!(std::mem::size_of::<Collider>(), 16);
        assert_eq!(std::mem::size_of::<RigidBody>(), 4);
        assert_eq!(std::mem::size_of::<Parent>(), 4);
    }

    #[test]
    fn test_default_transform_is_identity() {
        let t = Transform::default();
        assert_eq!(t.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.scale, [1.0; 3]);
    }
}
