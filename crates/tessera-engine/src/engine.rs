//! [`Engine`]: the store/load/purge orchestrator over an output directory.
//!
//! Each operation takes the directory's [`DirLock`] for its whole duration.
//! A `store` publishes only after every chunk is durable, and a `load`
//! deletes anything only after the whole file has been verified.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tessera_cas::{CasError, ChunkCodec, Chunker, DEFAULT_COMPRESSION_LEVEL, build_manifest};
use tessera_store::{ChunkStore, FileStore, StoreError};
use tessera_types::{ChunkAddress, DEFAULT_CHUNK_SIZE, Manifest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::lock::DirLock;
use crate::pipeline::{ChunkPipeline, PurgeReport};

/// Configuration for creating an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Uncompressed bytes per chunk (last chunk may be smaller).
    pub chunk_size: u32,
    /// zstd compression level.
    pub compression_level: i32,
    /// Maximum number of chunks processed concurrently.
    pub workers: usize,
    /// Delete the chunks, index and manifest after a successful load.
    pub consume_on_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            workers: default_workers(),
            consume_on_load: true,
        }
    }
}

/// Number of available CPUs, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Agreement between a directory's index and the chunk files it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkAudit {
    /// Indexed chunks with no payload file, with their index position.
    pub missing: Vec<(usize, ChunkAddress)>,
    /// Chunk files the index does not reference.
    pub orphans: Vec<ChunkAddress>,
}

impl ChunkAudit {
    /// Whether every indexed chunk is present and nothing else is.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.orphans.is_empty()
    }
}

/// Chunked storage engine.
///
/// Holds no state between calls apart from its configuration and
/// cancellation token, so a fresh engine can load what another one stored.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    chunker: Chunker,
    codec: ChunkCodec,
    cancel: CancellationToken,
}

impl Engine {
    /// Create an engine. Fails with [`EngineError::InvalidChunkSize`] for a
    /// zero chunk size.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let chunker =
            Chunker::new(config.chunk_size).map_err(|_| EngineError::InvalidChunkSize)?;
        let codec = ChunkCodec::new(config.compression_level);
        Ok(Self {
            config,
            chunker,
            codec,
            cancel: CancellationToken::new(),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token that cancels in-progress and future operations of this engine.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn pipeline(&self, store: FileStore) -> ChunkPipeline {
        ChunkPipeline::new(
            Arc::new(store),
            self.codec,
            self.config.workers,
            self.cancel.clone(),
        )
    }

    // ------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------

    /// Chunk, compress and persist `file_path` into `output_dir`.
    ///
    /// Replaces whatever was published in `output_dir` before: the new
    /// index is committed first, then the superseded chunks are deleted.
    /// On failure the previous index and its chunks are left untouched and
    /// no chunk written by this call remains.
    pub async fn store(
        &self,
        file_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Manifest, EngineError> {
        let (file_path, dir) = (file_path.as_ref(), output_dir.as_ref());
        let started = Instant::now();
        info!(
            file = %file_path.display(),
            dir = %dir.display(),
            chunk_size = self.config.chunk_size,
            "store: starting"
        );

        let store = FileStore::existing(dir);
        store
            .create_output_directory()
            .await
            .map_err(|e| match e {
                StoreError::Io(source) => EngineError::io(dir, source),
                other => other.into(),
            })?;
        let _lock = DirLock::acquire(dir)?;

        let catalog = Catalog::new(dir);
        let previous = match catalog.read_index().await {
            Ok(index) => index.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable previous index");
                Vec::new()
            }
        };

        let file = tokio::fs::File::open(file_path)
            .await
            .map_err(|e| EngineError::io(file_path, e))?;

        let pipeline = self.pipeline(store);
        let chunks = pipeline
            .write(self.chunker.stream(file))
            .await
            .map_err(|e| match e {
                EngineError::Cas(CasError::Io(source)) => EngineError::io(file_path, source),
                other => other,
            })?;
        let addresses: Vec<ChunkAddress> = chunks.iter().map(|c| c.address).collect();
        let total_size: u64 = chunks.iter().map(|c| c.size as u64).sum();
        debug!(num_chunks = chunks.len(), total_size, "all chunks durable");

        let published = async {
            let manifest = build_manifest(chunks, total_size, self.config.chunk_size)?;
            catalog.publish(&manifest).await?;
            Ok::<_, EngineError>(manifest)
        }
        .await;
        let manifest = match published {
            Ok(manifest) => manifest,
            Err(e) => {
                pipeline.discard(&addresses).await;
                return Err(e);
            }
        };

        let current: HashSet<ChunkAddress> = addresses.into_iter().collect();
        let stale: Vec<ChunkAddress> = previous
            .into_iter()
            .filter(|a| !current.contains(a))
            .collect();
        if !stale.is_empty() {
            let report = pipeline.discard(&stale).await;
            if report.failed > 0 {
                warn!(failed = report.failed, "some superseded chunks could not be deleted");
            }
            debug!(removed = report.removed, "deleted superseded chunks");
        }

        info!(
            file = %file_path.display(),
            total_size,
            num_chunks = manifest.len(),
            stored_size = manifest.stored_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "store: complete"
        );
        Ok(manifest)
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Verify and reassemble the file published in `output_dir`.
    ///
    /// With `consume_on_load`, the chunks, index and manifest are deleted
    /// once the whole file has been verified. Any failure leaves every file
    /// in place.
    pub async fn load(&self, output_dir: impl AsRef<Path>) -> Result<Vec<u8>, EngineError> {
        let dir = output_dir.as_ref();
        let catalog = Catalog::new(dir);
        let (_lock, index) = self.lock_published(dir, &catalog).await?;

        let manifest = catalog
            .read_manifest()
            .await?
            .ok_or_else(|| EngineError::ManifestMissing {
                path: catalog.manifest_path(),
            })?;

        self.restore(dir, &catalog, &index, &manifest).await
    }

    /// Like [`load`](Self::load), but verifies against `manifest` instead of
    /// the published `manifest.bin`. The published index must still list
    /// exactly the manifest's chunks.
    pub async fn load_with_manifest(
        &self,
        output_dir: impl AsRef<Path>,
        manifest: &Manifest,
    ) -> Result<Vec<u8>, EngineError> {
        let dir = output_dir.as_ref();
        let catalog = Catalog::new(dir);
        let (_lock, index) = self.lock_published(dir, &catalog).await?;
        self.restore(dir, &catalog, &index, manifest).await
    }

    async fn lock_published(
        &self,
        dir: &Path,
        catalog: &Catalog,
    ) -> Result<(DirLock, Vec<ChunkAddress>), EngineError> {
        let missing = || EngineError::IndexMissing {
            path: catalog.index_path(),
        };
        if !is_dir(dir).await {
            return Err(missing());
        }
        let lock = DirLock::acquire(dir)?;
        let index = catalog.read_index().await?.ok_or_else(missing)?;
        Ok((lock, index))
    }

    async fn restore(
        &self,
        dir: &Path,
        catalog: &Catalog,
        index: &[ChunkAddress],
        manifest: &Manifest,
    ) -> Result<Vec<u8>, EngineError> {
        let started = Instant::now();
        info!(dir = %dir.display(), num_chunks = index.len(), "load: starting");

        if manifest.addresses() != index {
            return Err(EngineError::CorruptManifest {
                reason: format!(
                    "manifest lists {} chunk(s) that do not match the {} indexed",
                    manifest.len(),
                    index.len()
                ),
            });
        }

        let pipeline = self.pipeline(FileStore::existing(dir));
        let data = pipeline.read(&manifest.chunks).await?;
        if data.len() as u64 != manifest.total_size {
            return Err(EngineError::LengthMismatch {
                expected: manifest.total_size,
                actual: data.len() as u64,
            });
        }

        if self.config.consume_on_load {
            // Index first: a partial cleanup must never leave an index
            // pointing at deleted chunks.
            match catalog.remove().await {
                Ok(()) => {
                    let report = pipeline.discard(index).await;
                    if report.failed > 0 {
                        warn!(failed = report.failed, "some loaded chunks could not be deleted");
                    }
                }
                Err(e) => warn!(error = %e, "failed to remove index after load, keeping chunks"),
            }
        }

        info!(
            dir = %dir.display(),
            total_size = manifest.total_size,
            consumed = self.config.consume_on_load,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "load: complete"
        );
        Ok(data)
    }

    // ------------------------------------------------------------------
    // Purge / inspect
    // ------------------------------------------------------------------

    /// Delete every chunk the published index references, then the index
    /// and manifest. A directory with nothing published is left as is.
    ///
    /// Missing chunks are counted, not fatal. If any deletion fails the
    /// index is kept so the purge can be retried.
    pub async fn purge(&self, output_dir: impl AsRef<Path>) -> Result<PurgeReport, EngineError> {
        let dir = output_dir.as_ref();
        if !is_dir(dir).await {
            debug!(dir = %dir.display(), "purge: no output directory");
            return Ok(PurgeReport::default());
        }
        let _lock = DirLock::acquire(dir)?;

        let catalog = Catalog::new(dir);
        let Some(index) = catalog.read_index().await? else {
            debug!(dir = %dir.display(), "purge: nothing published");
            return Ok(PurgeReport::default());
        };

        let report = self.pipeline(FileStore::existing(dir)).discard(&index).await;
        if report.failed > 0 {
            return Err(EngineError::PurgeIncomplete {
                failed: report.failed,
            });
        }
        catalog.remove().await?;

        info!(
            dir = %dir.display(),
            removed = report.removed,
            missing = report.missing,
            "purge: complete"
        );
        Ok(report)
    }

    /// Read the manifest published in `output_dir`.
    pub async fn inspect(&self, output_dir: impl AsRef<Path>) -> Result<Manifest, EngineError> {
        let catalog = Catalog::new(output_dir.as_ref());
        catalog
            .read_manifest()
            .await?
            .ok_or_else(|| EngineError::ManifestMissing {
                path: catalog.manifest_path(),
            })
    }

    /// Compare the published index with the chunk files in `output_dir`.
    ///
    /// Without a published index every chunk file is an orphan.
    pub async fn audit(&self, output_dir: impl AsRef<Path>) -> Result<ChunkAudit, EngineError> {
        let dir = output_dir.as_ref();
        if !is_dir(dir).await {
            return Ok(ChunkAudit::default());
        }
        let _lock = DirLock::acquire(dir)?;

        let index = Catalog::new(dir).read_index().await?.unwrap_or_default();
        let store = FileStore::existing(dir);

        let mut missing = Vec::new();
        for (position, &address) in index.iter().enumerate() {
            if !store.contains(address).await? {
                missing.push((position, address));
            }
        }

        let indexed: HashSet<ChunkAddress> = index.into_iter().collect();
        let mut orphans: Vec<ChunkAddress> = store
            .list()
            .await
            .map_err(|e| match e {
                StoreError::Io(source) => EngineError::io(dir, source),
                other => other.into(),
            })?
            .into_iter()
            .filter(|a| !indexed.contains(a))
            .collect();
        orphans.sort();

        if !missing.is_empty() || !orphans.is_empty() {
            warn!(
                dir = %dir.display(),
                missing = missing.len(),
                orphans = orphans.len(),
                "chunk files disagree with index"
            );
        }
        Ok(ChunkAudit { missing, orphans })
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
