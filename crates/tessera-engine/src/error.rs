//! Error types for the engine.

use std::path::PathBuf;

use tessera_types::{ChunkAddress, Digest};

/// Errors that can occur during engine operations.
///
/// Chunk-level variants carry the chunk's position in the index and its
/// address so a failure can be traced to a single file on disk.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Reading or writing a file outside the chunk store failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Chunk store error.
    #[error("store error: {0}")]
    Store(#[from] tessera_store::StoreError),

    /// Chunking / encoding error not tied to a single chunk.
    #[error("cas error: {0}")]
    Cas(#[from] tessera_cas::CasError),

    /// Chunk size must be positive.
    #[error("invalid chunk size 0: chunk size must be positive")]
    InvalidChunkSize,

    /// Compressing a chunk failed.
    #[error("failed to encode chunk {position}: {source}")]
    Encode {
        /// Position of the chunk in the file.
        position: usize,
        /// Underlying codec error.
        #[source]
        source: tessera_cas::CasError,
    },

    /// No index has been published in the output directory.
    #[error("no index found at {}", path.display())]
    IndexMissing {
        /// Expected index path.
        path: PathBuf,
    },

    /// The index length is not a whole number of addresses.
    #[error("corrupt index {}: {len} bytes is not a multiple of 16", path.display())]
    CorruptIndex {
        /// Index path.
        path: PathBuf,
        /// Length of the index file in bytes.
        len: usize,
    },

    /// No manifest accompanies the published index.
    #[error("no manifest found at {}", path.display())]
    ManifestMissing {
        /// Expected manifest path.
        path: PathBuf,
    },

    /// The manifest cannot be decoded or does not match the index.
    #[error("corrupt manifest: {reason}")]
    CorruptManifest {
        /// What was wrong.
        reason: String,
    },

    /// A chunk referenced by the index has no payload file.
    #[error("chunk {position} ({address}) is missing")]
    ChunkMissing {
        /// Position of the chunk in the index.
        position: usize,
        /// Address of the missing chunk.
        address: ChunkAddress,
    },

    /// A chunk payload could not be decompressed.
    #[error("chunk {position} ({address}) is corrupt: {reason}")]
    CorruptData {
        /// Position of the chunk in the index.
        position: usize,
        /// Address of the chunk.
        address: ChunkAddress,
        /// Decoder error.
        reason: String,
    },

    /// Decompressed chunk bytes do not match the recorded digest.
    #[error(
        "integrity mismatch in chunk {position} ({address}): expected {expected}, computed {actual}"
    )]
    IntegrityMismatch {
        /// Position of the chunk in the index.
        position: usize,
        /// Address of the chunk.
        address: ChunkAddress,
        /// Digest recorded at store time.
        expected: Digest,
        /// Digest of the decoded bytes.
        actual: Digest,
    },

    /// Reassembled output length differs from the manifest's total size.
    #[error("reassembled {actual} bytes but the manifest records {expected}")]
    LengthMismatch {
        /// Size recorded in the manifest.
        expected: u64,
        /// Size actually reassembled.
        actual: u64,
    },

    /// Another process or engine holds the output directory.
    #[error("output directory is locked by another operation ({})", path.display())]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },

    /// Some chunk files could not be deleted; the index was kept.
    #[error("purge incomplete: {failed} chunk file(s) could not be deleted")]
    PurgeIncomplete {
        /// Number of deletions that failed.
        failed: usize,
    },

    /// The operation was cancelled between chunks.
    #[error("operation cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
