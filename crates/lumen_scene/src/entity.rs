//! # Entity Identifiers
//!
//! Entities are dense: entity `i` is document node `i`. There is no
//! generational index because a store is rebuilt wholesale on reload and
//! entities are never destroyed individually.

/// A dense entity identifier, equal to the source document node index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The entity's index into component columns.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for EntityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity {}", self.0)
    }
}
