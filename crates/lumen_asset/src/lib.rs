//! # Lumen Asset
//!
//! Binary scene asset parsing for the Lumen engine.
//!
//! Accepts GLB containers and plain glTF 2.0 JSON, lowers them into a
//! validated [`Document`], and memoizes decoded payloads in a
//! [`ResourceCache`]. Every cross-list reference is checked at parse time;
//! a `Document` that made it out of [`parse`] has no dangling indices.
//!
//! The `EXT_behavior_graph` root extension is lowered alongside the scene
//! data, so the behavior runtime never touches raw JSON.

pub mod behavior;
pub mod cache;
pub mod document;
pub mod error;
pub mod glb;
pub mod json;
pub mod parser;

pub use behavior::{
    BehaviorExtension, BehaviorNode, NodeExtras, ParamValue, PathProperty, PathRef, Value,
    Variable, VariableType, BEHAVIOR_EXTENSION,
};
pub use cache::{PayloadDecoder, RawDecoder, ResourceCache};
pub use document::{
    Accessor, Animation, AnimationChannel, AnimationPath, AnimationSampler, Buffer, BufferData,
    BufferView, ColliderShape, ComponentType, Document, ElementType, Image, ImageSource,
    Interpolation, Material, Mesh, Node, PhysicsBodyKind, Primitive, Scene, Texture,
};
pub use error::{AssetError, AssetResult, RefKind};
pub use parser::{parse, validate, COLLIDER_EXTENSION, PHYSICS_BODY_EXTENSION};
