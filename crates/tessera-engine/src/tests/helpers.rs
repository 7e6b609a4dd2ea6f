//! Shared test utilities for tessera-engine tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::engine::{Engine, EngineConfig};

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

/// Incompressible pseudo-random bytes.
pub fn random_data(size: usize, seed: u8) -> Vec<u8> {
    let mut data = vec![0u8; size];
    blake3::Hasher::new()
        .update(&[seed])
        .finalize_xof()
        .fill(&mut data);
    data
}

/// Engine with a small chunk size and four workers.
pub fn engine(chunk_size: u32) -> Engine {
    engine_with(chunk_size, true)
}

/// Engine with a small chunk size and the given consume-on-load setting.
pub fn engine_with(chunk_size: u32, consume_on_load: bool) -> Engine {
    Engine::new(EngineConfig {
        chunk_size,
        compression_level: 3,
        workers: 4,
        consume_on_load,
    })
    .unwrap()
}

/// Scratch space: an input file and an output directory under one tempdir.
pub struct Fixture {
    pub root: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Fixture {
    /// Fixture whose input file holds `data`.
    pub fn new(data: &[u8]) -> Self {
        let root = TempDir::new().unwrap();
        let input = root.path().join("input.dat");
        std::fs::write(&input, data).unwrap();
        let output = root.path().join("output");
        Self {
            root,
            input,
            output,
        }
    }

    /// Replace the input file contents.
    pub fn rewrite_input(&self, data: &[u8]) {
        std::fs::write(&self.input, data).unwrap();
    }
}

/// Chunk payload files in `dir`, sorted by name.
pub fn chunk_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|ext| ext == "bin")
                && p.file_stem().is_some_and(|s| s.len() == 32)
        })
        .collect();
    files.sort();
    files
}

/// Names of every entry in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Flip every bit of the last byte of `path`.
pub fn corrupt_last_byte(path: &Path) {
    let mut bytes = std::fs::read(path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(path, bytes).unwrap();
}
