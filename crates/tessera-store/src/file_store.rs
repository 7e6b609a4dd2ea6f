//! File-based chunk storage backend.
//!
//! Stores one file per chunk directly in the output directory:
//! `{base_dir}/{hex(address)}.bin`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tessera_types::{ADDRESS_LEN, CHUNK_FILE_EXTENSION, ChunkAddress};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::traits::ChunkStore;

/// File-based chunk store with a flat directory layout.
///
/// The address-to-path mapping is deterministic, so no lookup table is kept.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place. A crash mid-write never leaves a truncated `.bin`.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory (and any missing parents) is created if it does not
    /// exist; an existing directory is fine.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create a file store without touching the filesystem.
    ///
    /// Used to read or purge directories that must already exist.
    pub fn existing(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Root directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure the output directory exists. Idempotent.
    pub async fn create_output_directory(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    /// Full file path for a chunk address.
    pub fn chunk_path(&self, address: &ChunkAddress) -> PathBuf {
        self.base_dir.join(address.file_name())
    }
}

#[async_trait::async_trait]
impl ChunkStore for FileStore {
    async fn put(&self, address: ChunkAddress, data: Bytes) -> Result<(), StoreError> {
        let path = self.chunk_path(&address);
        let tmp_path = path.with_extension("tmp");

        let result = async {
            tokio::fs::write(&tmp_path, &data).await?;
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(source) = result {
            if let Err(e) = tokio::fs::remove_file(&tmp_path).await
                && e.kind() != ErrorKind::NotFound
            {
                warn!(%address, error = %e, "failed to remove temp chunk file");
            }
            return Err(StoreError::Write { address, source });
        }

        debug!(%address, path = %path.display(), size = data.len(), "stored chunk to file");
        Ok(())
    }

    async fn get(&self, address: ChunkAddress) -> Result<Bytes, StoreError> {
        let path = self.chunk_path(&address);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(address)),
            Err(source) => Err(StoreError::Read { address, source }),
        }
    }

    async fn delete(&self, address: ChunkAddress) -> Result<bool, StoreError> {
        let path = self.chunk_path(&address);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%address, "deleted chunk file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Delete { address, source }),
        }
    }

    async fn contains(&self, address: ChunkAddress) -> Result<bool, StoreError> {
        let path = self.chunk_path(&address);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Read { address, source }),
        }
    }

    async fn list(&self) -> Result<Vec<ChunkAddress>, StoreError> {
        let mut addresses = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(address) = entry.file_name().to_str().and_then(parse_chunk_file_name) {
                addresses.push(address);
            }
        }
        Ok(addresses)
    }
}

/// Parse `<32 hex>.bin` back into an address. Other names yield `None`.
fn parse_chunk_file_name(name: &str) -> Option<ChunkAddress> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext != CHUNK_FILE_EXTENSION || stem.len() != ADDRESS_LEN * 2 {
        return None;
    }
    ChunkAddress::from_hex(stem).ok()
}
