//! Engine tying the Tessera components together.
//!
//! The [`Engine`] exposes the three boundary operations consumed by front
//! ends:
//!
//! - **store**: chunk, digest, compress and persist a file, then publish its index
//! - **load**: verify and reassemble the published file
//! - **purge**: delete every chunk the published index references
//!
//! Chunk-level work runs through a bounded [`ChunkPipeline`] over any
//! [`ChunkStore`](tessera_store::ChunkStore).

pub mod catalog;
pub mod engine;
pub mod error;
pub mod lock;
pub mod pipeline;

pub use catalog::Catalog;
pub use engine::{ChunkAudit, Engine, EngineConfig, default_workers};
pub use error::EngineError;
pub use lock::DirLock;
pub use pipeline::{ChunkPipeline, PurgeReport};

#[cfg(test)]
mod tests;
