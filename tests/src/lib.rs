//! Shared test harness for Tessera integration tests.
//!
//! Provides [`Scratch`], a temporary workspace holding input files and output
//! directories, plus data generators and helpers for tampering with what the
//! engine wrote to disk.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tessera_engine::{Engine, EngineConfig};

// =========================================================================
// Data generators
// =========================================================================

/// Generate deterministic, non-repeating test data.
pub fn test_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

/// Incompressible pseudo-random bytes derived from `seed`.
pub fn random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; size];
    blake3::Hasher::new()
        .update(&seed.to_le_bytes())
        .finalize_xof()
        .fill(&mut data);
    data
}

// =========================================================================
// Engines
// =========================================================================

/// Engine with the given chunk size, four workers and level 3.
pub fn engine(chunk_size: u32, consume_on_load: bool) -> Engine {
    Engine::new(EngineConfig {
        chunk_size,
        compression_level: 3,
        workers: 4,
        consume_on_load,
    })
    .unwrap()
}

// =========================================================================
// Scratch workspace
// =========================================================================

/// Temporary directory that owns every file a test creates.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Fresh, empty scratch directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an input file and return its path.
    pub fn input(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Path of an output directory (not created).
    pub fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// On-disk inspection and tampering
// =========================================================================

/// Chunk payload files (`<32 hex>.bin`) in `dir`, sorted.
pub fn chunk_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext == "bin")
                && p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit()))
        })
        .collect();
    files.sort();
    files
}

/// Whether `dir` holds nothing but the lock file.
pub fn only_lock_file_left(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .all(|name| name == ".tessera.lock")
}

/// XOR the byte `from_end` positions before the end of `path` with `mask`.
pub fn corrupt_byte(path: &Path, from_end: usize, mask: u8) {
    let mut bytes = std::fs::read(path).unwrap();
    let at = bytes.len() - 1 - from_end;
    bytes[at] ^= mask;
    std::fs::write(path, bytes).unwrap();
}

/// Truncate `path` to `len` bytes.
pub fn truncate(path: &Path, len: u64) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(len).unwrap();
}
