//! Fixed-size chunker for splitting files into independently stored chunks.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::CasError;

/// Initial buffer capacity for a streamed chunk.
const READ_CAPACITY_HINT: usize = 64 * 1024;

/// A single chunk of a file, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the file (0-based).
    pub index: usize,
    /// Byte offset within the original file.
    pub offset: u64,
    /// The raw chunk bytes.
    pub data: Bytes,
}

/// Fixed-size chunker that splits data into chunks of a configured size.
///
/// Every chunk except the last is exactly `chunk_size` bytes; the last holds
/// the remainder. Empty data produces zero chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: u32,
}

impl Chunker {
    /// Create a new chunker with the given chunk size in bytes.
    pub fn new(chunk_size: u32) -> Result<Self, CasError> {
        if chunk_size == 0 {
            return Err(CasError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    /// Configured chunk size in bytes.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of chunks a file of `len` bytes splits into.
    pub fn chunk_count(&self, len: u64) -> u64 {
        len.div_ceil(self.chunk_size as u64)
    }

    /// Split data into fixed-size chunks.
    ///
    /// Chunks share the input buffer; nothing is copied.
    pub fn split(&self, data: &Bytes) -> Vec<Chunk> {
        let chunk_size = self.chunk_size as usize;
        let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
        let mut start = 0usize;

        while start < data.len() {
            let end = (start + chunk_size).min(data.len());
            chunks.push(Chunk {
                index: chunks.len(),
                offset: start as u64,
                data: data.slice(start..end),
            });
            start = end;
        }

        chunks
    }

    /// Produce chunks from an async reader without buffering the whole input.
    pub fn stream<R: AsyncRead + Unpin>(&self, reader: R) -> ChunkStream<R> {
        ChunkStream {
            reader,
            chunk_size: self.chunk_size as usize,
            index: 0,
            offset: 0,
            done: false,
        }
    }
}

/// Pull-based chunk producer over an [`AsyncRead`].
///
/// Yields the same sequence of chunks [`Chunker::split`] would for the full
/// contents of the reader.
pub struct ChunkStream<R> {
    reader: R,
    chunk_size: usize,
    index: usize,
    offset: u64,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkStream<R> {
    /// Read the next chunk, or `None` at end of input.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, CasError> {
        if self.done {
            return Ok(None);
        }

        // Grows with the bytes actually read, up to chunk_size.
        let mut buf = Vec::with_capacity(self.chunk_size.min(READ_CAPACITY_HINT));
        let filled = (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)
            .await?;
        if filled < self.chunk_size {
            self.done = true;
        }

        if filled == 0 {
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data: Bytes::from(buf),
        };
        self.index += 1;
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    /// Drain the stream into a vector.
    pub async fn collect(mut self) -> Result<Vec<Chunk>, CasError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}
