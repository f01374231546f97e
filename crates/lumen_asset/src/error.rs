//! # Asset Error Types
//!
//! All errors that can occur while parsing or resolving a document.

use thiserror::Error;

/// Which document list a reference points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    /// `scenes` list.
    Scene,
    /// `nodes` list.
    Node,
    /// `meshes` list.
    Mesh,
    /// `materials` list.
    Material,
    /// `textures` list.
    Texture,
    /// `images` list.
    Image,
    /// `accessors` list.
    Accessor,
    /// `bufferViews` list.
    BufferView,
    /// `buffers` list.
    Buffer,
    /// `animations` list.
    Animation,
    /// Behavior extension `behaviorNodes` list.
    BehaviorNode,
    /// Behavior extension `variables` list.
    Variable,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scene => "scene",
            Self::Node => "node",
            Self::Mesh => "mesh",
            Self::Material => "material",
            Self::Texture => "texture",
            Self::Image => "image",
            Self::Accessor => "accessor",
            Self::BufferView => "buffer view",
            Self::Buffer => "buffer",
            Self::Animation => "animation",
            Self::BehaviorNode => "behavior node",
            Self::Variable => "variable",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while parsing or resolving a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The byte stream is not a valid GLB container or glTF JSON document.
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    /// An index does not resolve inside its target list.
    #[error("unresolved {kind} reference: index {index}")]
    UnresolvedReference {
        /// The list the index points into.
        kind: RefKind,
        /// The dangling index.
        index: usize,
    },
}

impl AssetError {
    /// Shorthand for an [`AssetError::UnresolvedReference`].
    #[must_use]
    pub const fn unresolved(kind: RefKind, index: usize) -> Self {
        Self::UnresolvedReference { kind, index }
    }
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
