//! # Scene Store
//!
//! The dense entity store built from one document. Entity `i` is document
//! node `i`; every entity carries a transform, the remaining components
//! are opt-in via the per-entity bitmask.
//!
//! Build order is document order, so two builds from equal documents
//! produce byte-identical snapshots.

use lumen_asset::{ColliderShape, Document, PhysicsBodyKind};

use crate::components::{
    body_kind, collider_kind, Collider, Component, MaterialRef, MeshRef, Parent, RigidBody,
    Transform,
};
use crate::entity::EntityId;
use crate::error::{SceneError, SceneResult};
use crate::storage::ComponentColumn;

/// The dense entity store for one loaded scene.
#[derive(Debug, Clone)]
pub struct SceneStore {
    masks: Vec<u64>,
    transforms: ComponentColumn<Transform>,
    mesh_refs: ComponentColumn<MeshRef>,
    material_refs: ComponentColumn<MaterialRef>,
    colliders: ComponentColumn<Collider>,
    bodies: ComponentColumn<RigidBody>,
    parents: ComponentColumn<Parent>,
}

impl SceneStore {
    /// Creates an empty store with `capacity` entities, all carrying only
    /// a default transform.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            masks: vec![Transform::mask(); capacity],
            transforms: ComponentColumn::new(capacity),
            mesh_refs: ComponentColumn::new(capacity),
            material_refs: ComponentColumn::new(capacity),
            colliders: ComponentColumn::new(capacity),
            bodies: ComponentColumn::new(capacity),
            parents: ComponentColumn::new(capacity),
        }
    }

    /// Builds the store from a parsed document, one entity per node.
    ///
    /// # Errors
    ///
    /// Propagates [`lumen_asset::AssetError`] if the document holds a
    /// dangling node or mesh index (cannot happen for documents out of
    /// [`lumen_asset::parse`], which validates first).
    pub fn build(document: &Document) -> SceneResult<Self> {
        let mut store = Self::with_capacity(document.nodes.len());

        for (index, node) in document.nodes.iter().enumerate() {
            store.transforms.set(
                index,
                Transform {
                    translation: node.translation,
                    rotation: node.rotation,
                    scale: node.scale,
                },
            );

            if let Some(mesh_index) = node.mesh {
                let mesh = document.mesh(mesh_index)?;
                store.mesh_refs.set(
                    index,
                    MeshRef {
                        mesh: mesh_index as u32,
                    },
                );
                store.masks[index] |= MeshRef::mask();

                if let Some(material) = mesh.primitives.first().and_then(|p| p.material) {
                    store.material_refs.set(
                        index,
                        MaterialRef {
                            material: material as u32,
                        },
                    );
                    store.masks[index] |= MaterialRef::mask();
                }
            }

            if let Some(shape) = node.collider {
                store.colliders.set(index, collider_component(shape));
                store.masks[index] |= Collider::mask();
            }
            if let Some(kind) = node.physics_body {
                store.bodies.set(index, body_component(kind));
                store.masks[index] |= RigidBody::mask();
            }
        }

        for (index, node) in document.nodes.iter().enumerate() {
            for &child in &node.children {
                document.node(child)?;
                store.parents.set(
                    child,
                    Parent {
                        parent: index as u32,
                    },
                );
                store.masks[child] |= Parent::mask();
            }
        }

        tracing::debug!(entities = store.len(), "built scene store");
        Ok(store)
    }

    /// Number of entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True if the store holds no entities.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// The component bitmask of an entity.
    pub fn mask(&self, entity: EntityId) -> SceneResult<u64> {
        self.masks
            .get(entity.index())
            .copied()
            .ok_or(SceneError::UnknownEntity(entity.0))
    }

    /// True if the entity carries component `C`.
    #[must_use]
    pub fn has<C: Component>(&self, entity: EntityId) -> bool {
        self.masks
            .get(entity.index())
            .is_some_and(|mask| mask & C::mask() != 0)
    }

    /// All entities whose mask contains every bit of `required`.
    pub fn entities_with(&self, required: u64) -> impl Iterator<Item = EntityId> + '_ {
        self.masks
            .iter()
            .enumerate()
            .filter(move |(_, &mask)| mask & required == required)
            .map(|(index, _)| EntityId(index as u32))
    }

    /// The transform of an entity.
    pub fn transform(&self, entity: EntityId) -> SceneResult<Transform> {
        self.transforms
            .get(entity.index())
            .copied()
            .ok_or(SceneError::UnknownEntity(entity.0))
    }

    /// Overwrites an entity's transform.
    pub fn set_transform(&mut self, entity: EntityId, transform: Transform) -> SceneResult<()> {
        if self.transforms.set(entity.index(), transform) {
            Ok(())
        } else {
            Err(SceneError::UnknownEntity(entity.0))
        }
    }

    /// All transforms, in entity order.
    #[must_use]
    pub fn transforms(&self) -> &[Transform] {
        self.transforms.as_slice()
    }

    /// The mesh reference, if the entity is drawable.
    #[must_use]
    pub fn mesh_ref(&self, entity: EntityId) -> Option<MeshRef> {
        self.has::<MeshRef>(entity)
            .then(|| self.mesh_refs.get(entity.index()).copied())
            .flatten()
    }

    /// The material reference, if present.
    #[must_use]
    pub fn material_ref(&self, entity: EntityId) -> Option<MaterialRef> {
        self.has::<MaterialRef>(entity)
            .then(|| self.material_refs.get(entity.index()).copied())
            .flatten()
    }

    /// The collider, if present.
    #[must_use]
    pub fn collider(&self, entity: EntityId) -> Option<Collider> {
        self.has::<Collider>(entity)
            .then(|| self.colliders.get(entity.index()).copied())
            .flatten()
    }

    /// The rigid body, if present.
    #[must_use]
    pub fn rigid_body(&self, entity: EntityId) -> Option<RigidBody> {
        self.has::<RigidBody>(entity)
            .then(|| self.bodies.get(entity.index()).copied())
            .flatten()
    }

    /// The parent link, if the entity is not a root.
    #[must_use]
    pub fn parent(&self, entity: EntityId) -> Option<Parent> {
        self.has::<Parent>(entity)
            .then(|| self.parents.get(entity.index()).copied())
            .flatten()
    }

    pub(crate) fn masks(&self) -> &[u64] {
        &self.masks
    }

    pub(crate) fn columns(
        &self,
    ) -> (
        &ComponentColumn<Transform>,
        &ComponentColumn<MeshRef>,
        &ComponentColumn<MaterialRef>,
        &ComponentColumn<Collider>,
        &ComponentColumn<RigidBody>,
        &ComponentColumn<Parent>,
    ) {
        (
            &self.transforms,
            &self.mesh_refs,
            &self.material_refs,
            &self.colliders,
            &self.bodies,
            &self.parents,
        )
    }

    pub(crate) fn restore_entity(
        &mut self,
        index: usize,
        mask: u64,
        transform: Transform,
        mesh_ref: MeshRef,
        material_ref: MaterialRef,
        collider: Collider,
        body: RigidBody,
        parent: Parent,
    ) {
        self.masks[index] = mask;
        self.transforms.set(index, transform);
        self.mesh_refs.set(index, mesh_ref);
        self.material_refs.set(index, material_ref);
        self.colliders.set(index, collider);
        self.bodies.set(index, body);
        self.parents.set(index, parent);
    }
}

fn collider_component(shape: ColliderShape) -> Collider {
    match shape {
        ColliderShape::Box { half_extents } => Collider {
            kind: collider_kind::BOX,
            params: half_extents,
        },
        ColliderShape::Sphere { radius } => Collider {
            kind: collider_kind::SPHERE,
            params: [radius, 0.0, 0.0],
        },
        ColliderShape::Capsule { radius, height } => Collider {
            kind: collider_kind::CAPSULE,
            params: [radius, height, 0.0],
        },
    }
}

fn body_component(kind: PhysicsBodyKind) -> RigidBody {
    RigidBody {
        kind: match kind {
            PhysicsBodyKind::Static => body_kind::STATIC,
            PhysicsBodyKind::Kinematic => body_kind::KINEMATIC,
            PhysicsBodyKind::Dynamic => body_kind::DYNAMIC,
        },
    }
}
