//! # Engine Error Types

use thiserror::Error;

/// Errors surfaced by the engine facade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The contexts have not finished their readiness handshake, or no
    /// scene is installed yet.
    #[error("engine context not ready")]
    ContextNotReady,

    /// A context reported itself lost; the session must be rebuilt.
    #[error("engine context lost")]
    ContextLost,

    /// The engine was destroyed; no further operations are accepted.
    #[error("engine destroyed")]
    EngineDestroyed,

    /// A context thread could not be spawned.
    #[error("failed to spawn context thread: {0}")]
    Spawn(String),

    /// A load or install failed inside a context.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// A context replied with a message the caller did not expect.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Asset parsing failed.
    #[error(transparent)]
    Asset(#[from] lumen_asset::AssetError),

    /// Scene building or snapshot decoding failed.
    #[error(transparent)]
    Scene(#[from] lumen_scene::SceneError),

    /// Behavior graph editing or execution failed.
    #[error(transparent)]
    Behavior(#[from] lumen_behavior::BehaviorError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
