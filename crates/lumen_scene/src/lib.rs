//! # Lumen Scene
//!
//! Dense entity store and deterministic binary snapshots.
//!
//! A [`SceneStore`] mirrors one parsed document: entity `i` is node `i`,
//! components are dense columns, presence is a per-entity bitmask. The
//! snapshot codec turns a store into bytes and back, and is the only way
//! scene state crosses a thread boundary.

pub mod components;
pub mod entity;
pub mod error;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use components::{
    body_kind, collider_kind, Collider, Component, MaterialRef, MeshRef, Parent, RigidBody,
    Transform,
};
pub use entity::EntityId;
pub use error::{SceneError, SceneResult};
pub use snapshot::{decode, encode, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use storage::ComponentColumn;
pub use store::SceneStore;
