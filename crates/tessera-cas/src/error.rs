//! Error types for chunk encoding operations.

use tessera_types::Digest;

/// Errors that can occur while chunking, compressing, verifying or
/// encoding the index and manifest.
#[derive(Debug, thiserror::Error)]
pub enum CasError {
    /// Chunk size must be a positive number of bytes.
    #[error("invalid chunk size 0: chunk size must be positive")]
    InvalidChunkSize,

    /// Compressed input could not be decoded.
    #[error("corrupt chunk data: {0}")]
    CorruptData(String),

    /// Decoded bytes do not hash to the recorded digest.
    #[error("integrity mismatch: expected digest {expected}, computed {actual}")]
    IntegrityMismatch {
        /// Digest recorded before compression.
        expected: Digest,
        /// Digest of the bytes actually decoded.
        actual: Digest,
    },

    /// Index length is not a whole number of addresses.
    #[error("corrupt index: {len} bytes is not a multiple of the address width")]
    CorruptIndex {
        /// Length of the index in bytes.
        len: usize,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Manifest decoded but its chunk records do not describe a contiguous file.
    #[error("inconsistent manifest: {0}")]
    InconsistentManifest(String),

    /// Manifest has an unsupported version.
    #[error("unsupported manifest version {found}, this build supports version {supported}")]
    UnsupportedVersion {
        /// Version found in the manifest.
        found: u8,
        /// Version this build supports.
        supported: u8,
    },

    /// An I/O error occurred during streaming.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
