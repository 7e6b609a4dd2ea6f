//! Bounded, cancellable chunk pipeline over a [`ChunkStore`].
//!
//! Writes digest, compress and persist each chunk on a worker pool of
//! `workers` concurrent chunks. Reads fetch, decode and verify with the same
//! bound and assemble the payloads in index order. Both sides check the
//! cancellation token between chunks.

use std::sync::Arc;

use bytes::Bytes;
use tessera_cas::{CasError, Chunk, ChunkCodec, ChunkStream, digest, verify};
use tessera_store::{ChunkStore, StoreError};
use tessera_types::{ChunkAddress, ChunkMeta};
use tokio::io::AsyncRead;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::EngineError;

/// Outcome of deleting a set of chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Chunks whose payload was deleted.
    pub removed: usize,
    /// Chunks that were already absent.
    pub missing: usize,
    /// Chunks whose deletion failed.
    pub failed: usize,
}

type ChunkTasks<T> = JoinSet<Result<(usize, T), EngineError>>;

/// Chunk-level store/load machinery shared by the engine and benchmarks.
#[derive(Clone)]
pub struct ChunkPipeline {
    store: Arc<dyn ChunkStore>,
    codec: ChunkCodec,
    workers: usize,
    cancel: CancellationToken,
}

impl ChunkPipeline {
    /// Create a pipeline. A worker count of zero is treated as one.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        codec: ChunkCodec,
        workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            codec,
            workers: workers.max(1),
            cancel,
        }
    }

    /// Backing chunk store.
    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Maximum number of chunks in flight.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Digest, compress and persist every chunk of `chunks`.
    ///
    /// Returns the chunk metadata in file order. On any failure, including
    /// cancellation, every payload written by this call is deleted before the
    /// error is returned.
    pub async fn write<R>(&self, mut chunks: ChunkStream<R>) -> Result<Vec<ChunkMeta>, EngineError>
    where
        R: AsyncRead + Unpin,
    {
        let mut tasks = JoinSet::new();
        let mut allocated = Vec::new();

        match self.write_all(&mut chunks, &mut tasks, &mut allocated).await {
            Ok(metas) => Ok(metas),
            Err(e) => {
                // Let in-flight puts land so their files can be removed.
                while tasks.join_next().await.is_some() {}
                let report = self.discard(&allocated).await;
                warn!(
                    error = %e,
                    allocated = allocated.len(),
                    removed = report.removed,
                    failed = report.failed,
                    "chunk write failed, rolled back"
                );
                Err(e)
            }
        }
    }

    async fn write_all<R>(
        &self,
        chunks: &mut ChunkStream<R>,
        tasks: &mut ChunkTasks<ChunkMeta>,
        allocated: &mut Vec<ChunkAddress>,
    ) -> Result<Vec<ChunkMeta>, EngineError>
    where
        R: AsyncRead + Unpin,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut done = Vec::new();

        loop {
            // Taking the permit before reading bounds read-ahead to `workers` chunks.
            let permit = self.acquire(&semaphore).await?;
            while let Some(joined) = tasks.try_join_next() {
                done.push(flatten(joined)?);
            }

            let Some(chunk) = chunks.next_chunk().await? else {
                break;
            };
            let address = ChunkAddress::generate();
            allocated.push(address);
            tasks.spawn(write_chunk(
                self.store.clone(),
                self.codec,
                chunk,
                address,
                permit,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            done.push(flatten(joined)?);
        }

        Ok(in_order(done))
    }

    /// Fetch, decode and verify `chunks`, concatenated in order.
    pub async fn read(&self, chunks: &[ChunkMeta]) -> Result<Vec<u8>, EngineError> {
        let mut tasks = JoinSet::new();
        let result = self.read_all(chunks, &mut tasks).await;
        if result.is_err() {
            tasks.shutdown().await;
        }
        let payloads = result?;

        let total: usize = payloads.iter().map(Bytes::len).sum();
        let mut out = Vec::with_capacity(total);
        for payload in &payloads {
            out.extend_from_slice(payload);
        }
        Ok(out)
    }

    async fn read_all(
        &self,
        chunks: &[ChunkMeta],
        tasks: &mut ChunkTasks<Bytes>,
    ) -> Result<Vec<Bytes>, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut done = Vec::with_capacity(chunks.len());

        for (position, meta) in chunks.iter().enumerate() {
            let permit = self.acquire(&semaphore).await?;
            while let Some(joined) = tasks.try_join_next() {
                done.push(flatten(joined)?);
            }
            tasks.spawn(read_chunk(
                self.store.clone(),
                self.codec,
                position,
                meta.clone(),
                permit,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            done.push(flatten(joined)?);
        }

        Ok(in_order(done))
    }

    /// Delete the given chunks, counting outcomes. Never fails.
    pub async fn discard(&self, addresses: &[ChunkAddress]) -> PurgeReport {
        let mut report = PurgeReport::default();
        for &address in addresses {
            match self.store.delete(address).await {
                Ok(true) => report.removed += 1,
                Ok(false) => report.missing += 1,
                Err(e) => {
                    warn!(%address, error = %e, "failed to delete chunk");
                    report.failed += 1;
                }
            }
        }
        debug!(
            removed = report.removed,
            missing = report.missing,
            failed = report.failed,
            "discarded chunks"
        );
        report
    }

    async fn acquire(&self, semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, EngineError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EngineError::Cancelled),
            permit = semaphore.clone().acquire_owned() => {
                permit.map_err(|e| EngineError::Task(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ChunkPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPipeline")
            .field("codec", &self.codec)
            .field("workers", &self.workers)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn write_chunk(
    store: Arc<dyn ChunkStore>,
    codec: ChunkCodec,
    chunk: Chunk,
    address: ChunkAddress,
    _permit: OwnedSemaphorePermit,
) -> Result<(usize, ChunkMeta), EngineError> {
    let Chunk {
        index: position,
        offset,
        data,
    } = chunk;
    let size = data.len() as u32;

    let (digest, stored_digest, encoded) = tokio::task::spawn_blocking(move || {
        let raw = digest(&data);
        codec
            .encode(&data)
            .map(|encoded| (raw, digest(&encoded), encoded))
    })
    .await
    .map_err(|e| EngineError::Task(e.to_string()))?
    .map_err(|source| EngineError::Encode { position, source })?;

    let stored_size = encoded.len() as u32;
    store.put(address, encoded).await?;

    debug!(position, %address, size, stored_size, "stored chunk");
    Ok((
        position,
        ChunkMeta {
            address,
            digest,
            stored_digest,
            offset,
            size,
            stored_size,
        },
    ))
}

async fn read_chunk(
    store: Arc<dyn ChunkStore>,
    codec: ChunkCodec,
    position: usize,
    meta: ChunkMeta,
    _permit: OwnedSemaphorePermit,
) -> Result<(usize, Bytes), EngineError> {
    let address = meta.address;
    let payload = match store.get(address).await {
        Ok(payload) => payload,
        Err(StoreError::NotFound(_)) => {
            return Err(EngineError::ChunkMissing { position, address });
        }
        Err(e) => return Err(e.into()),
    };

    let data = tokio::task::spawn_blocking(move || -> Result<Bytes, EngineError> {
        let mismatch = |e: CasError| match e {
            CasError::IntegrityMismatch { expected, actual } => {
                error!(position, %address, %expected, %actual, "chunk integrity check failed");
                EngineError::IntegrityMismatch {
                    position,
                    address,
                    expected,
                    actual,
                }
            }
            other => other.into(),
        };

        verify(&payload, &meta.stored_digest).map_err(&mismatch)?;
        let data = codec
            .decode(&payload, meta.size as usize)
            .map_err(|e| EngineError::CorruptData {
                position,
                address,
                reason: e.to_string(),
            })?;
        verify(&data, &meta.digest).map_err(&mismatch)?;
        Ok(data)
    })
    .await
    .map_err(|e| EngineError::Task(e.to_string()))??;

    debug!(position, %address, size = data.len(), "restored chunk");
    Ok((position, data))
}

fn flatten<T>(joined: Result<Result<T, EngineError>, JoinError>) -> Result<T, EngineError> {
    joined.map_err(|e| EngineError::Task(e.to_string()))?
}

fn in_order<T>(mut done: Vec<(usize, T)>) -> Vec<T> {
    done.sort_unstable_by_key(|(position, _)| *position);
    done.into_iter().map(|(_, item)| item).collect()
}
