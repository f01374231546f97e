//! # Shared Transform Channel
//!
//! Lock-free publication of per-entity transforms from the simulation
//! context to presentation threads. Transforms are quantized to fixed
//! point and stored in per-component relaxed atomics.
//!
//! Cells are allocated by [`SharedTransformChannel::register_entity`] and
//! released by [`SharedTransformChannel::deregister_entity`]; the facade
//! registers every scene entity on load, and the render context registers
//! one cell per player. Ownership rule: exactly one writer per cell (the
//! simulation tick, or the host through its [`TransformHandle`]), any
//! number of readers.
//!
//! ## Torn reads
//!
//! Components are independent atomics; a reader may observe a translation
//! whose x comes from one tick and y from the next. That is acceptable
//! for presentation, which resamples every frame, and it is what keeps
//! this path entirely lock-free. Consumers that need a consistent whole
//! transform must go through the engine's scene access instead.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI16, AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Fixed-point scale for translation components (0.1 mm resolution).
pub const POSITION_SCALE: f32 = 10_000.0;

/// Fixed-point scale for unit quaternion components.
pub const ROTATION_SCALE: f32 = 32_767.0;

/// Quantizes a translation component to fixed point.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_position(value: f32) -> i32 {
    (value * POSITION_SCALE).round() as i32
}

/// Dequantizes a translation component.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dequantize_position(value: i32) -> f32 {
    value as f32 / POSITION_SCALE
}

/// Quantizes a unit quaternion component to `i16` range.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_rotation(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * ROTATION_SCALE).round() as i16
}

/// Dequantizes a unit quaternion component.
#[inline]
#[must_use]
pub fn dequantize_rotation(value: i16) -> f32 {
    f32::from(value) / ROTATION_SCALE
}

/// One entity's published transform, in per-component atomics.
#[derive(Debug, Default)]
pub struct TransformCell {
    position: [AtomicI32; 3],
    rotation: [AtomicI16; 4],
}

impl TransformCell {
    fn store(&self, translation: [f32; 3], rotation: [f32; 4]) {
        for (slot, value) in self.position.iter().zip(translation) {
            slot.store(quantize_position(value), Ordering::Relaxed);
        }
        for (slot, value) in self.rotation.iter().zip(rotation) {
            slot.store(quantize_rotation(value), Ordering::Relaxed);
        }
    }

    fn load(&self) -> ([f32; 3], [f32; 4]) {
        let mut translation = [0.0f32; 3];
        for (out, slot) in translation.iter_mut().zip(&self.position) {
            *out = dequantize_position(slot.load(Ordering::Relaxed));
        }
        let mut rotation = [0.0f32; 4];
        for (out, slot) in rotation.iter_mut().zip(&self.rotation) {
            *out = dequantize_rotation(slot.load(Ordering::Relaxed));
        }
        (translation, rotation)
    }
}

/// A writer's (or reader's) grip on one registered cell.
///
/// The handle keeps its cell alive even across deregistration, so a
/// stale writer cannot corrupt another entity's slot; its stores just go
/// nowhere once the channel no longer maps the id. Callers are expected
/// to drop handles when the entity deregisters.
#[derive(Debug, Clone)]
pub struct TransformHandle {
    cell: Arc<TransformCell>,
}

impl TransformHandle {
    /// Quantizes and atomically stores a translation.
    pub fn set_position(&self, x: f32, y: f32, z: f32) {
        for (slot, value) in self.cell.position.iter().zip([x, y, z]) {
            slot.store(quantize_position(value), Ordering::Relaxed);
        }
    }

    /// Quantizes and atomically stores a rotation quaternion.
    pub fn set_rotation(&self, x: f32, y: f32, z: f32, w: f32) {
        for (slot, value) in self.cell.rotation.iter().zip([x, y, z, w]) {
            slot.store(quantize_rotation(value), Ordering::Relaxed);
        }
    }

    /// Atomically loads and dequantizes the translation.
    #[must_use]
    pub fn read_position(&self) -> [f32; 3] {
        self.cell.load().0
    }

    /// Atomically loads and dequantizes the rotation.
    #[must_use]
    pub fn read_rotation(&self) -> [f32; 4] {
        self.cell.load().1
    }
}

/// The channel: a registry of cells keyed by entity id.
#[derive(Debug, Default)]
pub struct SharedTransformChannel {
    cells: RwLock<BTreeMap<u32, Arc<TransformCell>>>,
}

impl SharedTransformChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates (or revisits) the cell for `id` and hands back a write
    /// handle. Registering an already-registered id reuses its cell.
    pub fn register_entity(&self, id: u32) -> TransformHandle {
        let cell = Arc::clone(
            self.cells
                .write()
                .entry(id)
                .or_insert_with(|| Arc::new(TransformCell::default())),
        );
        TransformHandle { cell }
    }

    /// Releases the cell for `id`. Returns false if it was never
    /// registered. Outstanding handles keep the old cell readable but it
    /// is no longer reachable through the channel.
    pub fn deregister_entity(&self, id: u32) -> bool {
        self.cells.write().remove(&id).is_some()
    }

    /// A handle on an already-registered cell.
    #[must_use]
    pub fn handle(&self, id: u32) -> Option<TransformHandle> {
        self.cells
            .read()
            .get(&id)
            .map(|cell| TransformHandle {
                cell: Arc::clone(cell),
            })
    }

    /// Number of registered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Bulk write for the simulation tick. Unregistered ids are ignored;
    /// the writer may race a scene swap by one tick.
    pub fn publish(&self, id: u32, translation: [f32; 3], rotation: [f32; 4]) {
        if let Some(cell) = self.cells.read().get(&id) {
            cell.store(translation, rotation);
        }
    }

    /// Drops every registered cell.
    pub fn clear(&self) {
        self.cells.write().clear();
    }

    /// Takes a read snapshot of the registry. Entities registered after
    /// this call are not visible through the returned reader.
    #[must_use]
    pub fn reader(&self) -> TransformReader {
        TransformReader {
            cells: self.cells.read().clone(),
        }
    }
}

/// A reader's snapshot of the registered cells.
///
/// The cells themselves stay live: values written after the snapshot are
/// visible, only registrations and deregistrations are not.
#[derive(Debug, Clone)]
pub struct TransformReader {
    cells: BTreeMap<u32, Arc<TransformCell>>,
}

impl TransformReader {
    /// Number of readable cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if this snapshot has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads one entity's dequantized translation and rotation.
    #[must_use]
    pub fn read(&self, id: u32) -> Option<([f32; 3], [f32; 4])> {
        self.cells.get(&id).map(|cell| cell.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantization_round_trip_tolerance() {
        for value in [-12.3456, 0.0, 0.00005, 999.9999] {
            let round = dequantize_position(quantize_position(value));
            assert!((round - value).abs() <= 0.5 / POSITION_SCALE + f32::EPSILON);
        }
        for value in [-1.0, -0.707, 0.0, 0.5, 1.0] {
            let round = dequantize_rotation(quantize_rotation(value));
            assert!((round - value).abs() <= 1.0 / ROTATION_SCALE);
        }
    }

    #[test]
    fn test_rotation_quantization_clamps() {
        assert_eq!(quantize_rotation(2.0), i16::MAX);
        assert_eq!(quantize_rotation(-2.0), -i16::MAX);
    }

    #[test]
    fn test_handle_writes_visible_to_reader() {
        let channel = SharedTransformChannel::new();
        let handle = channel.register_entity(7);
        handle.set_position(1.2345, 0.0, -3.0);
        handle.set_rotation(0.0, 0.0, 0.0, 1.0);

        let reader = channel.reader();
        let (translation, rotation) = reader.read(7).unwrap();
        assert!((translation[0] - 1.2345).abs() <= 1.0 / POSITION_SCALE);
        assert!((translation[2] + 3.0).abs() <= 1.0 / POSITION_SCALE);
        assert!((rotation[3] - 1.0).abs() <= 1.0 / ROTATION_SCALE);
        assert_eq!(handle.read_position(), reader.read(7).unwrap().0);
    }

    #[test]
    fn test_deregister_releases_cell() {
        let channel = SharedTransformChannel::new();
        let handle = channel.register_entity(3);
        handle.set_position(5.0, 0.0, 0.0);

        assert!(channel.deregister_entity(3));
        assert!(!channel.deregister_entity(3));
        assert!(channel.handle(3).is_none());
        assert!(channel.reader().read(3).is_none());
        // The stale handle still points at its own cell, nothing else.
        assert!((handle.read_position()[0] - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_publish_to_unregistered_id_ignored() {
        let channel = SharedTransformChannel::new();
        channel.register_entity(0);
        channel.publish(9, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0]);
        assert!(channel.reader().read(9).is_none());
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn test_reader_pins_registrations_not_values() {
        let channel = SharedTransformChannel::new();
        let handle = channel.register_entity(1);
        let reader = channel.reader();

        channel.register_entity(2);
        handle.set_position(9.0, 0.0, 0.0);

        // New registration invisible, new value visible.
        assert!(reader.read(2).is_none());
        assert!((reader.read(1).unwrap().0[0] - 9.0).abs() < 1e-3);

        channel.clear();
        assert!(channel.is_empty());
    }
}
