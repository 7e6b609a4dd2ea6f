//! Chunk payload storage trait and backend implementations.
//!
//! This crate defines the [`ChunkStore`] trait for persisting compressed
//! chunk payloads by address, along with two concrete backends:
//!
//! - [`FileStore`]: one `<hex>.bin` file per chunk directly in an output directory.
//! - [`MemoryStore`]: in-memory storage backed by a `RwLock<HashMap>`.

mod error;
mod file_store;
mod memory_store;
mod traits;

pub use error::StoreError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use traits::ChunkStore;
