//! # Lumen
//!
//! An embedded real-time scene engine.
//!
//! Lumen parses binary scene assets (GLB / glTF 2.0 with the
//! `EXT_behavior_graph` extension), mirrors them into a dense entity
//! store, executes behavior graphs against the live scene, and runs the
//! whole thing across loader, render, and simulation threads behind one
//! [`Engine`] facade.
//!
//! ```no_run
//! use lumen::{Engine, EngineOptions, NodeRegistry, SurfaceHandle};
//!
//! # async fn demo(scene_bytes: Vec<u8>) -> Result<(), lumen::EngineError> {
//! let engine = Engine::new(
//!     SurfaceHandle::default(),
//!     EngineOptions::default(),
//!     NodeRegistry::with_builtins(),
//! )?;
//! engine.wait_for_ready().await?;
//! let info = engine.load(scene_bytes).await?;
//! println!("loaded {} entities", info.entity_count);
//! engine.destroy();
//! # Ok(())
//! # }
//! ```

pub use lumen_asset as asset;
pub use lumen_behavior as behavior;
pub use lumen_runtime as runtime;
pub use lumen_scene as scene;

pub use lumen_asset::{parse, AssetError, Document};
pub use lumen_behavior::{BehaviorError, GraphRuntime, NodeRegistry};
pub use lumen_runtime::{
    ContextKind, ControlsMode, Engine, EngineError, EngineOptions, Message, SceneInfo,
    SurfaceHandle,
};
pub use lumen_scene::{EntityId, SceneError, SceneStore};
