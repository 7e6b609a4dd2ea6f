//! Chunking, compression, integrity digests and index encoding.
//!
//! This crate provides the pure building blocks of the storage engine:
//! - [`Chunker`]: splits data into fixed-size chunks, in memory or from a stream.
//! - [`ChunkCodec`]: per-chunk zstd compression.
//! - [`digest`] / [`verify`]: BLAKE3 integrity checks on uncompressed bytes.
//! - [`serialize_index`] / [`deserialize_index`]: the flat 16-byte-per-entry index.
//! - [`build_manifest`]: constructs and (de)serializes the per-chunk [`Manifest`].
//!
//! [`Manifest`]: tessera_types::Manifest

mod chunker;
mod codec;
mod error;
mod index;
mod manifest;
mod verify;

pub use chunker::{Chunk, ChunkStream, Chunker};
pub use codec::{ChunkCodec, DEFAULT_COMPRESSION_LEVEL};
pub use error::CasError;
pub use index::{deserialize_index, serialize_index};
pub use manifest::{
    build_manifest, build_manifest_with_timestamp, deserialize_manifest, serialize_manifest,
};
pub use verify::{digest, verify};
