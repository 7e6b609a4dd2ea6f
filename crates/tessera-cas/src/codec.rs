//! Per-chunk compression.
//!
//! Each chunk is compressed into a single self-contained zstd frame. Frames
//! are written without the optional zstd content checksum: corruption is
//! detected by BLAKE3 digests of the payload and the decoded bytes, not by
//! the codec. Decoding is bounded by the chunk size recorded at store time.

use bytes::Bytes;

use crate::error::CasError;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Whole-buffer zstd codec for chunk payloads.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    level: i32,
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ChunkCodec {
    /// Create a codec with the given zstd level.
    ///
    /// Levels outside zstd's supported range are clamped.
    pub fn new(level: i32) -> Self {
        let range = zstd::compression_level_range();
        Self {
            level: level.clamp(*range.start(), *range.end()),
        }
    }

    /// Effective compression level.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Compress a chunk.
    pub fn encode(&self, data: &[u8]) -> Result<Bytes, CasError> {
        let compressed = zstd::stream::encode_all(data, self.level)?;
        Ok(Bytes::from(compressed))
    }

    /// Decompress a chunk of at most `max_size` bytes.
    ///
    /// Fails with [`CasError::CorruptData`] when the input is not a complete,
    /// well-formed zstd frame or would expand past `max_size`.
    pub fn decode(&self, data: &[u8], max_size: usize) -> Result<Bytes, CasError> {
        if data.is_empty() {
            return Err(CasError::CorruptData("empty payload".to_string()));
        }
        zstd::bulk::decompress(data, max_size)
            .map(Bytes::from)
            .map_err(|e| CasError::CorruptData(e.to_string()))
    }
}
