//! Shared types and identifiers for Tessera.
//!
//! This crate defines the values every other crate passes around:
//! identifiers ([`ChunkAddress`], [`Digest`]), the persisted per-chunk
//! record ([`ChunkMeta`]) and the [`Manifest`] that ties a stored file
//! together, plus the on-disk naming constants shared by the store and the
//! engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Width of a chunk address in bytes.
pub const ADDRESS_LEN: usize = 16;

/// Width of a chunk digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Default chunk size: 20 MiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 20 * 1024 * 1024;

/// Current manifest format version.
pub const MANIFEST_VERSION: u8 = 1;

/// File name of the ordered address index inside an output directory.
pub const INDEX_FILE_NAME: &str = "index.bin";

/// File name of the persisted manifest inside an output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.bin";

/// File name of the advisory lock inside an output directory.
pub const LOCK_FILE_NAME: &str = ".tessera.lock";

/// Extension of chunk payload files.
pub const CHUNK_FILE_EXTENSION: &str = "bin";

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Error returned when parsing an identifier from hex fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} hex string {input:?}: expected {expected} hex characters")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
    expected: usize,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Return the raw byte representation.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from a hex string (either case).
            pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                    input: s.to_string(),
                    expected: $len * 2,
                })?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

define_id!(
    /// Opaque 128-bit storage key for a chunk.
    ///
    /// Addresses are random, not derived from content: two chunks with the
    /// same bytes get different addresses. Uniqueness is probabilistic
    /// (122 random bits from a UUIDv4); nothing checks for collisions.
    ChunkAddress,
    ADDRESS_LEN
);

define_id!(
    /// BLAKE3 hash of a chunk's uncompressed bytes.
    Digest,
    DIGEST_LEN
);

impl ChunkAddress {
    /// Allocate a fresh random address.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// File name of the chunk payload for this address: `<hex>.bin`.
    pub fn file_name(&self) -> String {
        format!("{self}.{CHUNK_FILE_EXTENSION}")
    }
}

impl Digest {
    /// Hash arbitrary data with BLAKE3.
    pub fn from_data(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Persisted metadata for one chunk of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Storage key of the compressed payload.
    pub address: ChunkAddress,
    /// Digest of the uncompressed bytes, taken before compression.
    pub digest: Digest,
    /// Digest of the compressed payload as written to the store. Checked
    /// before decoding so a damaged payload never reaches the decoder.
    pub stored_digest: Digest,
    /// Byte offset of this chunk within the original file.
    pub offset: u64,
    /// Uncompressed size in bytes.
    pub size: u32,
    /// Compressed (on-disk) size in bytes.
    pub stored_size: u32,
}

/// Everything needed to verify and reassemble a stored file.
///
/// `chunks` is kept in index order, so `chunks[i].address` is the `i`-th
/// entry of the persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version, checked on decode.
    pub version: u8,
    /// Total size of the original file in bytes.
    pub total_size: u64,
    /// Chunk size the file was split with (last chunk may be smaller).
    pub chunk_size: u32,
    /// Per-chunk metadata in reassembly order.
    pub chunks: Vec<ChunkMeta>,
    /// Unix timestamp (seconds) when the file was stored.
    pub created_at: u64,
}

impl Manifest {
    /// Addresses in reassembly order.
    pub fn addresses(&self) -> Vec<ChunkAddress> {
        self.chunks.iter().map(|c| c.address).collect()
    }

    /// Total compressed bytes across all chunks.
    pub fn stored_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.stored_size as u64).sum()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the manifest describes an empty file.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
