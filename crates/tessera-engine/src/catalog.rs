//! Index and manifest files of an output directory.
//!
//! A directory holds at most one published file: `index.bin` (the flat
//! address list) and `manifest.bin` (per-chunk digests and sizes). Both are
//! staged as temp files and renamed into place, manifest first. The index
//! rename is the commit point of a `store`. The manifest it replaces is kept
//! as `manifest.bak` until then and restored if the index cannot be renamed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tessera_cas::{
    CasError, deserialize_index, deserialize_manifest, serialize_index, serialize_manifest,
};
use tessera_types::{ChunkAddress, INDEX_FILE_NAME, MANIFEST_FILE_NAME, Manifest};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Reader/writer for the index and manifest of one output directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
}

impl Catalog {
    /// Catalog for the given output directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    /// Path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    fn backup_path(&self) -> PathBuf {
        self.manifest_path().with_extension("bak")
    }

    /// Read the published index. `None` if nothing is published.
    pub async fn read_index(&self) -> Result<Option<Vec<ChunkAddress>>, EngineError> {
        let path = self.index_path();
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        match deserialize_index(&bytes) {
            Ok(addresses) => Ok(Some(addresses)),
            Err(CasError::CorruptIndex { len }) => Err(EngineError::CorruptIndex { path, len }),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the published manifest. `None` if absent.
    pub async fn read_manifest(&self) -> Result<Option<Manifest>, EngineError> {
        let path = self.manifest_path();
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        deserialize_manifest(&bytes)
            .map(Some)
            .map_err(|e| EngineError::CorruptManifest {
                reason: format!("{}: {e}", path.display()),
            })
    }

    /// Publish a manifest and its index, replacing whatever was published.
    pub async fn publish(&self, manifest: &Manifest) -> Result<(), EngineError> {
        let index_bytes = serialize_index(&manifest.addresses());
        let manifest_bytes = serialize_manifest(manifest)?;

        let index_tmp = self.index_path().with_extension("tmp");
        let manifest_tmp = self.manifest_path().with_extension("tmp");

        let staged = async {
            write_file(&manifest_tmp, &manifest_bytes).await?;
            write_file(&index_tmp, &index_bytes).await
        }
        .await;
        if let Err(e) = staged {
            remove_optional(&manifest_tmp).await.ok();
            remove_optional(&index_tmp).await.ok();
            return Err(e);
        }

        let backup = self.backup_path();
        let had_previous = match tokio::fs::copy(self.manifest_path(), &backup).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                remove_optional(&manifest_tmp).await.ok();
                remove_optional(&index_tmp).await.ok();
                return Err(EngineError::io(&backup, e));
            }
        };

        let committed = async {
            rename(&manifest_tmp, &self.manifest_path()).await?;
            rename(&index_tmp, &self.index_path()).await
        }
        .await;
        if let Err(e) = committed {
            let restored = if had_previous {
                rename(&backup, &self.manifest_path()).await
            } else {
                remove_optional(&self.manifest_path()).await
            };
            if let Err(restore) = restored {
                warn!(error = %restore, "failed to restore previous manifest");
            }
            remove_optional(&manifest_tmp).await.ok();
            remove_optional(&index_tmp).await.ok();
            return Err(e);
        }
        if let Err(e) = remove_optional(&backup).await {
            warn!(error = %e, "failed to remove manifest backup");
        }

        debug!(
            dir = %self.dir.display(),
            chunks = manifest.len(),
            index_bytes = index_bytes.len(),
            "published index and manifest"
        );
        Ok(())
    }

    /// Remove the published index and manifest, index first.
    pub async fn remove(&self) -> Result<(), EngineError> {
        remove_optional(&self.index_path()).await?;
        remove_optional(&self.manifest_path()).await?;
        remove_optional(&self.backup_path()).await?;
        Ok(())
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, EngineError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::io(path, e)),
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| EngineError::io(path, e))
}

async fn rename(from: &Path, to: &Path) -> Result<(), EngineError> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| EngineError::io(to, e))
}

async fn remove_optional(path: &Path) -> Result<(), EngineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::io(path, e)),
    }
}
