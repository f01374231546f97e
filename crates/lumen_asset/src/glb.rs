//! # GLB Container Reader
//!
//! Splits a binary glTF container into its JSON and BIN chunks.
//!
//! ## Layout (bit-exact, glTF 2.0)
//!
//! ```text
//! [magic "glTF": 4 bytes][version: u32 = 2][total length: u32]
//! repeated: [chunk length: u32][chunk type: u32][payload: chunk length bytes]
//! ```
//!
//! Exactly one JSON chunk is required. A BIN chunk is optional and supplies
//! the default buffer for embedded accessors. All integers are little-endian.

use crate::error::{AssetError, AssetResult};

/// Magic bytes at the start of every GLB container.
pub const GLB_MAGIC: [u8; 4] = *b"glTF";

/// The only container version this reader accepts.
pub const GLB_VERSION: u32 = 2;

/// Size of the fixed container header in bytes.
pub const GLB_HEADER_SIZE: usize = 12;

/// Chunk type tag for the JSON chunk (`"JSON"` as little-endian u32).
pub const CHUNK_JSON: u32 = 0x4E4F_534A;

/// Chunk type tag for the binary payload chunk (`"BIN\0"` as little-endian u32).
pub const CHUNK_BIN: u32 = 0x004E_4942;

/// The chunks extracted from one GLB container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlbChunks {
    /// The JSON document chunk payload.
    pub json: Vec<u8>,
    /// The binary payload chunk, if present.
    pub bin: Option<Vec<u8>>,
}

/// Returns true if the byte stream starts with the GLB magic.
///
/// This is the sniff used to choose between the binary container and a
/// plain JSON document; it makes no claim about overall validity.
#[inline]
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == GLB_MAGIC
}

/// Splits a GLB byte stream into its chunks.
///
/// # Errors
///
/// Returns [`AssetError::MalformedAsset`] for a wrong magic or version, a
/// length field that disagrees with the byte stream, a truncated chunk,
/// a duplicate JSON chunk, or a missing JSON chunk.
pub fn split(bytes: &[u8]) -> AssetResult<GlbChunks> {
    let mut reader = ChunkReader::new(bytes);

    let magic = reader
        .read_bytes(4)
        .ok_or_else(|| AssetError::MalformedAsset("container shorter than header".into()))?;
    if magic != GLB_MAGIC {
        return Err(AssetError::MalformedAsset(format!(
            "bad magic {magic:?}, expected \"glTF\""
        )));
    }

    let version = reader
        .read_u32()
        .ok_or_else(|| AssetError::MalformedAsset("container shorter than header".into()))?;
    if version != GLB_VERSION {
        return Err(AssetError::MalformedAsset(format!(
            "unsupported container version {version}, expected {GLB_VERSION}"
        )));
    }

    let total_length = reader
        .read_u32()
        .ok_or_else(|| AssetError::MalformedAsset("container shorter than header".into()))?;
    if total_length as usize != bytes.len() {
        return Err(AssetError::MalformedAsset(format!(
            "length field says {total_length} bytes, stream has {}",
            bytes.len()
        )));
    }

    let mut json: Option<Vec<u8>> = None;
    let mut bin: Option<Vec<u8>> = None;

    while reader.remaining() > 0 {
        let (chunk_type, payload) = reader.read_chunk()?;
        match chunk_type {
            CHUNK_JSON => {
                if json.is_some() {
                    return Err(AssetError::MalformedAsset("duplicate JSON chunk".into()));
                }
                json = Some(payload.to_vec());
            }
            CHUNK_BIN => {
                if bin.is_some() {
                    tracing::warn!("ignoring extra BIN chunk");
                } else {
                    bin = Some(payload.to_vec());
                }
            }
            other => {
                tracing::debug!(chunk_type = other, "skipping unknown chunk");
            }
        }
    }

    let json = json
        .ok_or_else(|| AssetError::MalformedAsset("container has no JSON chunk".into()))?;
    Ok(GlbChunks { json, bin })
}

/// Little-endian cursor over a chunk stream.
struct ChunkReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ChunkReader<'a> {
    const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    #[inline]
    const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    #[inline]
    fn read_u32(&mut self) -> Option<u32> {
        if self.position + 4 > self.buffer.len() {
            return None;
        }
        let value = u32::from_le_bytes([
            self.buffer[self.position],
            self.buffer[self.position + 1],
            self.buffer[self.position + 2],
            self.buffer[self.position + 3],
        ]);
        self.position += 4;
        Some(value)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.position + len > self.buffer.len() {
            return None;
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Some(slice)
    }

    fn read_chunk(&mut self) -> AssetResult<(u32, &'a [u8])> {
        let length = self
            .read_u32()
            .ok_or_else(|| AssetError::MalformedAsset("truncated chunk header".into()))?;
        let chunk_type = self
            .read_u32()
            .ok_or_else(|| AssetError::MalformedAsset("truncated chunk header".into()))?;
        let payload = self.read_bytes(length as usize).ok_or_else(|| {
            AssetError::MalformedAsset(format!("chunk payload truncated: need {length} bytes"))
        })?;
        Ok((chunk_type, payload))
    }
}
