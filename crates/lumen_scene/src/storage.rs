//! # Component Columns
//!
//! Dense per-type component storage. One column holds one slot per entity,
//! pre-allocated at build time; presence is tracked by the store's bitmask,
//! not by the column.

use crate::components::Component;

/// A dense column of one component type, one slot per entity.
///
/// Slots for entities that do not carry the component hold the default
/// value; the owning store's bitmask decides which slots are live.
#[derive(Debug, Clone)]
pub struct ComponentColumn<C: Component> {
    data: Box<[C]>,
}

impl<C: Component> ComponentColumn<C> {
    /// Creates a column with `capacity` default-initialized slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![C::default(); capacity].into_boxed_slice(),
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The slot at `index`, or `None` out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)
    }

    /// Mutable slot access.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)
    }

    /// Overwrites the slot at `index`. Returns false out of bounds.
    #[inline]
    pub fn set(&mut self, index: usize, component: C) -> bool {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = component;
            true
        } else {
            false
        }
    }

    /// All slots, live or not.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }
}
