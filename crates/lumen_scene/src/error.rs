//! # Scene Error Types

use thiserror::Error;

/// Errors from building, querying, or (de)serializing a scene store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// An index in the source document did not resolve.
    #[error(transparent)]
    Asset(#[from] lumen_asset::AssetError),

    /// The snapshot byte stream does not decode.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// An entity id is out of range for this store.
    #[error("unknown entity {0}")]
    UnknownEntity(u32),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
