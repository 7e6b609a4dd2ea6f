//! In-memory chunk storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tessera_types::ChunkAddress;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ChunkStore;

/// In-memory chunk store backed by a `RwLock<HashMap>`.
///
/// Useful for testing and for benchmarking the pipeline without disk I/O.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chunks: RwLock<HashMap<ChunkAddress, Bytes>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes held.
    pub fn used_bytes(&self) -> u64 {
        let map = self.chunks.read().expect("lock poisoned");
        map.values().map(|v| v.len() as u64).sum()
    }
}

#[async_trait::async_trait]
impl ChunkStore for MemoryStore {
    async fn put(&self, address: ChunkAddress, data: Bytes) -> Result<(), StoreError> {
        debug!(%address, size = data.len(), "storing chunk in memory");
        let mut map = self.chunks.write().expect("lock poisoned");
        map.insert(address, data);
        Ok(())
    }

    async fn get(&self, address: ChunkAddress) -> Result<Bytes, StoreError> {
        let map = self.chunks.read().expect("lock poisoned");
        map.get(&address)
            .cloned()
            .ok_or(StoreError::NotFound(address))
    }

    async fn delete(&self, address: ChunkAddress) -> Result<bool, StoreError> {
        let mut map = self.chunks.write().expect("lock poisoned");
        let removed = map.remove(&address).is_some();
        debug!(%address, removed, "deleted chunk from memory");
        Ok(removed)
    }

    async fn contains(&self, address: ChunkAddress) -> Result<bool, StoreError> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.contains_key(&address))
    }

    async fn list(&self) -> Result<Vec<ChunkAddress>, StoreError> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.keys().copied().collect())
    }
}
