//! # Lumen Runtime
//!
//! Thread orchestration for the Lumen engine: the loader, render, and
//! simulation contexts, the correlated control protocol between them,
//! the shared transform channel, and the [`Engine`] facade that ties it
//! all together for a host application.

mod context;
pub mod engine;
pub mod error;
pub mod message;
pub mod options;
pub mod shared_transform;

pub use engine::{Engine, SceneInfo};
pub use error::{EngineError, EngineResult};
pub use message::{ContextKind, Envelope, Message, TransformControlsMode};
pub use options::{ControlsMode, EngineOptions, SurfaceHandle};
pub use shared_transform::{
    dequantize_position, dequantize_rotation, quantize_position, quantize_rotation,
    SharedTransformChannel, TransformCell, TransformHandle, TransformReader, POSITION_SCALE,
    ROTATION_SCALE,
};
