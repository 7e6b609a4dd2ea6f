//! Integrity digests over uncompressed chunk bytes.

use tessera_types::Digest;

use crate::error::CasError;

/// Compute the BLAKE3 digest of raw chunk bytes.
pub fn digest(data: &[u8]) -> Digest {
    Digest::from_data(data)
}

/// Check decoded chunk bytes against the digest recorded before compression.
pub fn verify(data: &[u8], expected: &Digest) -> Result<(), CasError> {
    let actual = digest(data);
    if actual != *expected {
        return Err(CasError::IntegrityMismatch {
            expected: *expected,
            actual,
        });
    }
    Ok(())
}
