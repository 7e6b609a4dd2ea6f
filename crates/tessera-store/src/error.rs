//! Error types for chunk storage operations.

use tessera_types::ChunkAddress;

/// Errors that can occur during chunk storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk has no backing payload.
    #[error("chunk not found: {0}")]
    NotFound(ChunkAddress),

    /// Writing a chunk payload failed.
    #[error("failed to write chunk {address}: {source}")]
    Write {
        /// Chunk being written.
        address: ChunkAddress,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a chunk payload failed for a reason other than absence.
    #[error("failed to read chunk {address}: {source}")]
    Read {
        /// Chunk being read.
        address: ChunkAddress,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Deleting a chunk payload failed.
    #[error("failed to delete chunk {address}: {source}")]
    Delete {
        /// Chunk being deleted.
        address: ChunkAddress,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O error (directory creation, listing).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
