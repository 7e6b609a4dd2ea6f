//! Core trait for chunk storage.

use bytes::Bytes;
use tessera_types::ChunkAddress;

use crate::error::StoreError;

/// Trait for storing and retrieving compressed chunk payloads by address.
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Data is passed as [`Bytes`] so payloads move through the pipeline
/// without copies.
#[async_trait::async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store a payload under the given address, replacing any existing one.
    async fn put(&self, address: ChunkAddress, data: Bytes) -> Result<(), StoreError>;

    /// Retrieve a payload. Fails with [`StoreError::NotFound`] if absent.
    async fn get(&self, address: ChunkAddress) -> Result<Bytes, StoreError>;

    /// Delete a payload. Returns `false` if there was nothing to delete.
    async fn delete(&self, address: ChunkAddress) -> Result<bool, StoreError>;

    /// Check whether a payload exists.
    async fn contains(&self, address: ChunkAddress) -> Result<bool, StoreError>;

    /// List all stored addresses, in no particular order.
    async fn list(&self) -> Result<Vec<ChunkAddress>, StoreError>;
}
