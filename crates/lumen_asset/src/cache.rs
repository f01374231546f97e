//! # Resource Cache
//!
//! Decoded-payload cache keyed by document index. Accessor and image bytes
//! are extracted from their buffers once and memoized; repeated reads hand
//! back the same `Arc` without touching the decoder again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::{BufferData, Document};
use crate::error::{AssetError, AssetResult, RefKind};

/// Decodes an encoded payload (image bytes, compressed streams) into the
/// form a consumer wants. The cache calls this at most once per entry.
pub trait PayloadDecoder: Send + Sync {
    /// Decodes `encoded`, returning the payload to cache.
    fn decode(&self, encoded: &[u8], mime_type: Option<&str>) -> AssetResult<Vec<u8>>;
}

/// The identity decoder: hands back the encoded bytes unchanged.
///
/// Image decoding proper happens on the render side; the asset layer only
/// needs stable byte extraction and memoization.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawDecoder;

impl PayloadDecoder for RawDecoder {
    fn decode(&self, encoded: &[u8], _mime_type: Option<&str>) -> AssetResult<Vec<u8>> {
        Ok(encoded.to_vec())
    }
}

/// Memoized accessor and image payloads for one document.
///
/// Interior mutability keeps the read API `&self`; the maps are guarded by
/// independent mutexes so accessor and image lookups never contend.
pub struct ResourceCache {
    accessors: Mutex<HashMap<usize, Arc<[u8]>>>,
    images: Mutex<HashMap<usize, Arc<[u8]>>>,
    decoder: Box<dyn PayloadDecoder>,
    decode_count: AtomicUsize,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("accessors", &self.accessors.lock().len())
            .field("images", &self.images.lock().len())
            .field("decode_count", &self.decode_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(Box::new(RawDecoder))
    }
}

impl ResourceCache {
    /// Creates an empty cache with the given payload decoder.
    #[must_use]
    pub fn new(decoder: Box<dyn PayloadDecoder>) -> Self {
        Self {
            accessors: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            decoder,
            decode_count: AtomicUsize::new(0),
        }
    }

    /// Number of decode operations performed so far. Stays flat on cache
    /// hits, which is what the memoization tests assert on.
    #[must_use]
    pub fn decode_count(&self) -> usize {
        self.decode_count.load(Ordering::Relaxed)
    }

    /// The tightly packed bytes of an accessor, extracting from its buffer
    /// view on first access.
    ///
    /// Interleaved views (a `byteStride` larger than the element size) are
    /// de-interleaved into contiguous elements. Accessors without a buffer
    /// view yield implicit zeros.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnresolvedReference`] for a dangling index and
    /// [`AssetError::MalformedAsset`] when the view overruns its buffer or
    /// the buffer's bytes are still external.
    pub fn accessor_bytes(&self, document: &Document, index: usize) -> AssetResult<Arc<[u8]>> {
        if let Some(bytes) = self.accessors.lock().get(&index) {
            return Ok(Arc::clone(bytes));
        }

        let accessor = document.accessor(index)?;
        let element_size = accessor.element_size();
        let packed_len = element_size * accessor.count;

        let bytes: Arc<[u8]> = match accessor.buffer_view {
            None => Arc::from(vec![0u8; packed_len]),
            Some(view_index) => {
                let view = document.buffer_view(view_index)?;
                let buffer = document.buffer(view.buffer)?;
                let data = match &buffer.data {
                    BufferData::Binary(data) => data,
                    BufferData::External { uri, .. } => {
                        return Err(AssetError::MalformedAsset(format!(
                            "buffer {} not resolved: external uri {uri:?}",
                            view.buffer
                        )));
                    }
                };
                let view_bytes = data
                    .get(view.byte_offset..view.byte_offset + view.byte_length)
                    .ok_or_else(|| {
                        AssetError::MalformedAsset(format!(
                            "buffer view {view_index} overruns buffer {}",
                            view.buffer
                        ))
                    })?;

                let stride = view.byte_stride.unwrap_or(element_size);
                if stride < element_size {
                    return Err(AssetError::MalformedAsset(format!(
                        "buffer view {view_index} stride {stride} smaller than element size {element_size}"
                    )));
                }

                if stride == element_size {
                    let slice = view_bytes
                        .get(accessor.byte_offset..accessor.byte_offset + packed_len)
                        .ok_or_else(|| {
                            AssetError::MalformedAsset(format!(
                                "accessor {index} overruns its buffer view"
                            ))
                        })?;
                    Arc::from(slice)
                } else {
                    let mut packed = Vec::with_capacity(packed_len);
                    for element in 0..accessor.count {
                        let start = accessor.byte_offset + element * stride;
                        let slice =
                            view_bytes.get(start..start + element_size).ok_or_else(|| {
                                AssetError::MalformedAsset(format!(
                                    "accessor {index} overruns its buffer view"
                                ))
                            })?;
                        packed.extend_from_slice(slice);
                    }
                    Arc::from(packed)
                }
            }
        };

        self.decode_count.fetch_add(1, Ordering::Relaxed);
        self.accessors.lock().insert(index, Arc::clone(&bytes));
        Ok(bytes)
    }

    /// The decoded bytes of an image, running the payload decoder on first
    /// access.
    ///
    /// URI-sourced images are not fetched here; asking for one is an error
    /// until a loader has inlined its bytes into a buffer view.
    pub fn image_bytes(&self, document: &Document, index: usize) -> AssetResult<Arc<[u8]>> {
        if let Some(bytes) = self.images.lock().get(&index) {
            return Ok(Arc::clone(bytes));
        }

        let image = document.image(index)?;
        let encoded: Arc<[u8]> = match &image.source {
            crate::document::ImageSource::Uri(uri) => {
                return Err(AssetError::MalformedAsset(format!(
                    "image {index} not resolved: external uri {uri:?}"
                )));
            }
            crate::document::ImageSource::BufferView(view_index) => {
                let view = document.buffer_view(*view_index)?;
                let buffer = document.buffer(view.buffer)?;
                let data = match &buffer.data {
                    BufferData::Binary(data) => data,
                    BufferData::External { .. } => {
                        return Err(AssetError::unresolved(RefKind::Buffer, view.buffer));
                    }
                };
                let slice = data
                    .get(view.byte_offset..view.byte_offset + view.byte_length)
                    .ok_or_else(|| {
                        AssetError::MalformedAsset(format!(
                            "buffer view {view_index} overruns buffer {}",
                            view.buffer
                        ))
                    })?;
                Arc::from(slice)
            }
        };

        let decoded = self.decoder.decode(&encoded, image.mime_type.as_deref())?;
        self.decode_count.fetch_add(1, Ordering::Relaxed);
        let decoded: Arc<[u8]> = Arc::from(decoded);
        self.images.lock().insert(index, Arc::clone(&decoded));
        Ok(decoded)
    }

    /// Drops all memoized payloads, keeping the decoder.
    pub fn clear(&self) {
        self.accessors.lock().clear();
        self.images.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        Accessor, Buffer, BufferView, ComponentType, ElementType, Image, ImageSource,
    };

    fn one_buffer_document(bytes: Vec<u8>) -> Document {
        let byte_length = bytes.len();
        let mut doc = Document::default();
        doc.buffers.push(Buffer {
            data: BufferData::Binary(Arc::from(bytes)),
        });
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: 0,
            byte_length,
            byte_stride: None,
        });
        doc
    }

    #[test]
    fn test_accessor_bytes_memoized() {
        let mut doc = one_buffer_document(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        doc.accessors.push(Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::F32,
            count: 2,
            element_type: ElementType::Scalar,
        });

        let cache = ResourceCache::default();
        let first = cache.accessor_bytes(&doc, 0).unwrap();
        let second = cache.accessor_bytes(&doc, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.decode_count(), 1);
    }

    #[test]
    fn test_interleaved_accessor_deinterleaved() {
        // Two u16 scalars interleaved with 2 bytes of padding each.
        let mut doc = one_buffer_document(vec![0x11, 0x22, 0xAA, 0xAA, 0x33, 0x44, 0xBB, 0xBB]);
        doc.buffer_views[0].byte_stride = Some(4);
        doc.accessors.push(Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::U16,
            count: 2,
            element_type: ElementType::Scalar,
        });

        let cache = ResourceCache::default();
        let bytes = cache.accessor_bytes(&doc, 0).unwrap();
        assert_eq!(&bytes[..], &[0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_accessor_without_view_is_zeroed() {
        let mut doc = Document::default();
        doc.accessors.push(Accessor {
            buffer_view: None,
            byte_offset: 0,
            component_type: ComponentType::F32,
            count: 3,
            element_type: ElementType::Vec3,
        });

        let cache = ResourceCache::default();
        let bytes = cache.accessor_bytes(&doc, 0).unwrap();
        assert_eq!(bytes.len(), 3 * 3 * 4);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_overrunning_accessor_is_malformed() {
        let mut doc = one_buffer_document(vec![0u8; 4]);
        doc.accessors.push(Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::F32,
            count: 4,
            element_type: ElementType::Vec3,
        });

        let cache = ResourceCache::default();
        assert!(matches!(
            cache.accessor_bytes(&doc, 0),
            Err(AssetError::MalformedAsset(_))
        ));
    }

    #[test]
    fn test_image_bytes_through_decoder() {
        let mut doc = one_buffer_document(vec![9, 8, 7]);
        doc.images.push(Image {
            name: None,
            source: ImageSource::BufferView(0),
            mime_type: Some("image/png".into()),
        });

        let cache = ResourceCache::default();
        let bytes = cache.image_bytes(&doc, 0).unwrap();
        assert_eq!(&bytes[..], &[9, 8, 7]);
        assert_eq!(cache.decode_count(), 1);
        cache.image_bytes(&doc, 0).unwrap();
        assert_eq!(cache.decode_count(), 1);
    }

    #[test]
    fn test_unresolved_image_uri_rejected() {
        let mut doc = Document::default();
        doc.images.push(Image {
            name: None,
            source: ImageSource::Uri("textures/wall.png".into()),
            mime_type: None,
        });

        let cache = ResourceCache::default();
        assert!(cache.image_bytes(&doc, 0).is_err());
    }
}
