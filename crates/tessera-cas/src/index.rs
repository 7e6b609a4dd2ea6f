//! Flat binary index of chunk addresses.
//!
//! Layout: the 16-byte addresses concatenated in reassembly order. No header,
//! no checksum, no length prefix; the entry count is `len / 16`.

use tessera_types::{ADDRESS_LEN, ChunkAddress};

use crate::error::CasError;

/// Encode addresses into the index layout.
pub fn serialize_index(addresses: &[ChunkAddress]) -> Vec<u8> {
    let mut out = Vec::with_capacity(addresses.len() * ADDRESS_LEN);
    for address in addresses {
        out.extend_from_slice(address.as_bytes());
    }
    out
}

/// Decode an index.
///
/// Fails with [`CasError::CorruptIndex`] when the length is not a multiple of
/// the address width.
pub fn deserialize_index(bytes: &[u8]) -> Result<Vec<ChunkAddress>, CasError> {
    if bytes.len() % ADDRESS_LEN != 0 {
        return Err(CasError::CorruptIndex { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(ADDRESS_LEN)
        .map(|entry| {
            let mut raw = [0u8; ADDRESS_LEN];
            raw.copy_from_slice(entry);
            ChunkAddress::from(raw)
        })
        .collect())
}
