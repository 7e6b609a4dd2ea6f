//! TOML configuration for the `tessera` command.
//!
//! Every key is optional. Command line flags override file values.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tessera_cas::DEFAULT_COMPRESSION_LEVEL;
use tessera_engine::{EngineConfig, default_workers};
use tessera_types::DEFAULT_CHUNK_SIZE;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Output directory and chunking parameters.
    pub storage: StorageSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[storage]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding chunk files, the index and the manifest.
    pub output_dir: PathBuf,
    /// Chunk size in bytes. Defaults to 20 MiB.
    pub chunk_size: Option<u32>,
    /// zstd compression level. Defaults to 3.
    pub compression_level: Option<i32>,
    /// Number of chunks processed concurrently. Defaults to the CPU count.
    pub workers: Option<usize>,
    /// Keep the stored chunks after a successful `load`.
    pub keep_after_load: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            chunk_size: None,
            compression_level: None,
            workers: None,
            keep_after_load: false,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("cannot read {}", p.display()))?;
                let config: CliConfig = toml::from_str(&content)
                    .with_context(|| format!("invalid config {}", p.display()))?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Effective chunk size (config value or 20 MiB default).
    pub fn chunk_size(&self) -> u32 {
        self.storage.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Effective compression level.
    pub fn compression_level(&self) -> i32 {
        self.storage
            .compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Effective worker count, at least one.
    pub fn workers(&self) -> usize {
        self.storage.workers.unwrap_or_else(default_workers).max(1)
    }

    /// Engine configuration derived from this file.
    ///
    /// The CLI never lets the engine consume on load: it deletes the stored
    /// chunks itself once the destination file has been written.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chunk_size: self.chunk_size(),
            compression_level: self.compression_level(),
            workers: self.workers(),
            consume_on_load: false,
        }
    }
}
