//! Manifest building and serialization.
//!
//! The [`Manifest`] is the persisted form of the per-chunk records a `store`
//! produces: address, digest and sizes for every chunk, in index order. It is
//! serialized with postcard next to the index so that a fresh process can
//! verify every chunk it loads.

use tessera_types::{ChunkMeta, MANIFEST_VERSION, Manifest};

use crate::error::CasError;

/// Build a [`Manifest`] from chunk records, stamped with the current time.
pub fn build_manifest(
    chunks: Vec<ChunkMeta>,
    total_size: u64,
    chunk_size: u32,
) -> Result<Manifest, CasError> {
    build_manifest_with_timestamp(chunks, total_size, chunk_size, now_secs())
}

/// Build a manifest with an explicit timestamp (for deterministic testing).
///
/// Rejects chunk records that do not tile `0..total_size` in order.
pub fn build_manifest_with_timestamp(
    chunks: Vec<ChunkMeta>,
    total_size: u64,
    chunk_size: u32,
    created_at: u64,
) -> Result<Manifest, CasError> {
    let manifest = Manifest {
        version: MANIFEST_VERSION,
        total_size,
        chunk_size,
        chunks,
        created_at,
    };
    check_layout(&manifest)?;
    Ok(manifest)
}

/// Serialize a manifest to postcard bytes.
pub fn serialize_manifest(manifest: &Manifest) -> Result<Vec<u8>, CasError> {
    postcard::to_allocvec(manifest).map_err(|e| CasError::Serialization(e.to_string()))
}

/// Deserialize a manifest from postcard bytes.
///
/// Rejects unknown versions and manifests whose chunks do not tile the file.
pub fn deserialize_manifest(bytes: &[u8]) -> Result<Manifest, CasError> {
    let manifest: Manifest =
        postcard::from_bytes(bytes).map_err(|e| CasError::Serialization(e.to_string()))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(CasError::UnsupportedVersion {
            found: manifest.version,
            supported: MANIFEST_VERSION,
        });
    }
    check_layout(&manifest)?;
    Ok(manifest)
}

fn check_layout(manifest: &Manifest) -> Result<(), CasError> {
    let mut expected_offset = 0u64;
    for (i, chunk) in manifest.chunks.iter().enumerate() {
        if chunk.offset != expected_offset {
            return Err(CasError::InconsistentManifest(format!(
                "chunk {i} starts at offset {} but the previous chunk ends at {expected_offset}",
                chunk.offset
            )));
        }
        expected_offset += chunk.size as u64;
    }
    if expected_offset != manifest.total_size {
        return Err(CasError::InconsistentManifest(format!(
            "chunks cover {expected_offset} bytes but total size is {}",
            manifest.total_size
        )));
    }
    Ok(())
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
