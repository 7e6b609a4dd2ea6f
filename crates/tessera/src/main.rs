//! `tessera`: split files into compressed, verified chunks and put them
//! back together.
//!
//! # Usage
//!
//! ```text
//! tessera store ./video.mp4                  # chunk into ./output
//! tessera -o /mnt/chunks store big.iso -s 8388608
//! tessera load --dest ./restored.mp4         # verify, reassemble, clean up
//! tessera load --dest ./copy.mp4 --keep      # keep the chunks afterwards
//! tessera inspect                            # show the published manifest
//! tessera purge                              # delete the published chunks
//! tessera benchmark -n 20 -s 10485760        # in-memory throughput
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tessera_cas::{ChunkCodec, Chunker};
use tessera_engine::{ChunkPipeline, Engine};
use tessera_store::MemoryStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "tessera",
    version,
    about = "Chunked, compressed, integrity-checked file storage"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the output directory.
    #[arg(short, long, global = true, env = "TESSERA_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into chunks and publish its index.
    Store {
        /// File to store.
        file: PathBuf,

        /// Chunk size in bytes.
        #[arg(short = 's', long)]
        chunk_size: Option<u32>,

        /// Number of chunks processed concurrently.
        #[arg(short, long)]
        workers: Option<usize>,

        /// zstd compression level.
        #[arg(short, long)]
        level: Option<i32>,
    },

    /// Verify and reassemble the published file.
    Load {
        /// Where to write the reassembled file.
        #[arg(short, long)]
        dest: PathBuf,

        /// Keep the chunks, index and manifest after a successful load.
        #[arg(short, long)]
        keep: bool,
    },

    /// Delete every chunk of the published file.
    Purge,

    /// Show the published manifest.
    Inspect,

    /// Run a quick in-memory store/load benchmark.
    Benchmark {
        /// Number of files to store and load.
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Size of each file in bytes.
        #[arg(short, long, default_value = "10485760")]
        size: usize,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    // CLI args override config file values.
    if let Some(dir) = cli.output_dir {
        config.storage.output_dir = dir;
    }

    match cli.command {
        Commands::Store {
            file,
            chunk_size,
            workers,
            level,
        } => {
            if chunk_size.is_some() {
                config.storage.chunk_size = chunk_size;
            }
            if workers.is_some() {
                config.storage.workers = workers;
            }
            if level.is_some() {
                config.storage.compression_level = level;
            }
            cmd_store(&config, &file).await
        }
        Commands::Load { dest, keep } => {
            if keep {
                config.storage.keep_after_load = true;
            }
            cmd_load(&config, &dest).await
        }
        Commands::Purge => cmd_purge(&config).await,
        Commands::Inspect => cmd_inspect(&config).await,
        Commands::Benchmark { count, size } => cmd_benchmark(&config, count, size).await,
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build an engine whose operations stop at the next chunk on Ctrl-C.
fn engine(config: &CliConfig) -> Result<Engine> {
    let engine = Engine::new(config.engine_config()).context("invalid engine configuration")?;
    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            token.cancel();
        }
    });
    Ok(engine)
}

// -----------------------------------------------------------------------
// tessera store
// -----------------------------------------------------------------------

async fn cmd_store(config: &CliConfig, file: &Path) -> Result<()> {
    let dir = &config.storage.output_dir;
    info!(
        file = %file.display(),
        dir = %dir.display(),
        chunk_size = config.chunk_size(),
        workers = config.workers(),
        level = config.compression_level(),
        "storing file"
    );

    let start = Instant::now();
    let manifest = engine(config)?
        .store(file, dir)
        .await
        .with_context(|| format!("failed to store {}", file.display()))?;
    let elapsed = start.elapsed();

    println!("Stored {} into {}", file.display(), dir.display());
    println!("  chunks:     {}", manifest.len());
    println!("  size:       {}", fmt_bytes(manifest.total_size));
    println!(
        "  stored:     {} ({:.1}%)",
        fmt_bytes(manifest.stored_size()),
        ratio(manifest.stored_size(), manifest.total_size)
    );
    println!("  elapsed:    {:.2}s", elapsed.as_secs_f64());
    Ok(())
}

// -----------------------------------------------------------------------
// tessera load
// -----------------------------------------------------------------------

async fn cmd_load(config: &CliConfig, dest: &Path) -> Result<()> {
    let dir = &config.storage.output_dir;
    let engine = engine(config)?;

    let start = Instant::now();
    let data = engine
        .load(dir)
        .await
        .with_context(|| format!("failed to load from {}", dir.display()))?;
    tokio::fs::write(dest, &data)
        .await
        .with_context(|| format!("failed to write {}", dest.display()))?;
    let elapsed = start.elapsed();

    println!(
        "Restored {} to {} in {:.2}s",
        fmt_bytes(data.len() as u64),
        dest.display(),
        elapsed.as_secs_f64()
    );

    // Chunks are only deleted once the destination file is safely written.
    if !config.storage.keep_after_load {
        let report = engine
            .purge(dir)
            .await
            .with_context(|| format!("restored, but failed to clean up {}", dir.display()))?;
        println!("Removed {} chunk file(s)", report.removed);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// tessera purge
// -----------------------------------------------------------------------

async fn cmd_purge(config: &CliConfig) -> Result<()> {
    let dir = &config.storage.output_dir;
    let report = engine(config)?
        .purge(dir)
        .await
        .with_context(|| format!("failed to purge {}", dir.display()))?;

    println!(
        "Purged {}: {} removed, {} already missing",
        dir.display(),
        report.removed,
        report.missing
    );
    Ok(())
}

// -----------------------------------------------------------------------
// tessera inspect
// -----------------------------------------------------------------------

async fn cmd_inspect(config: &CliConfig) -> Result<()> {
    let dir = &config.storage.output_dir;
    let engine = engine(config)?;
    let manifest = engine
        .inspect(dir)
        .await
        .with_context(|| format!("nothing to inspect in {}", dir.display()))?;
    let audit = engine
        .audit(dir)
        .await
        .with_context(|| format!("failed to audit {}", dir.display()))?;

    println!("Manifest v{} in {}", manifest.version, dir.display());
    println!("  created:    {} (unix)", manifest.created_at);
    println!("  size:       {}", fmt_bytes(manifest.total_size));
    println!("  chunk size: {}", fmt_bytes(manifest.chunk_size as u64));
    println!(
        "  stored:     {} ({:.1}%)",
        fmt_bytes(manifest.stored_size()),
        ratio(manifest.stored_size(), manifest.total_size)
    );
    println!("  chunks:     {}", manifest.len());
    println!();
    println!(
        "  {:>5}  {:<32}  {:>12}  {:>10}  {:>10}  digest",
        "#", "address", "offset", "size", "stored"
    );
    for (i, chunk) in manifest.chunks.iter().enumerate() {
        println!(
            "  {:>5}  {}  {:>12}  {:>10}  {:>10}  {}",
            i, chunk.address, chunk.offset, chunk.size, chunk.stored_size, chunk.digest
        );
    }

    if !audit.is_clean() {
        println!();
        for (i, address) in &audit.missing {
            println!("  missing: chunk {i} ({address})");
        }
        for address in &audit.orphans {
            println!("  orphan:  {}", address.file_name());
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// tessera benchmark
// -----------------------------------------------------------------------

async fn cmd_benchmark(config: &CliConfig, count: usize, size: usize) -> Result<()> {
    let chunk_size = config.chunk_size();
    let workers = config.workers();
    let level = config.compression_level();

    println!("Tessera Benchmark");
    println!("  files:      {count}");
    println!("  size:       {size} bytes each");
    println!("  chunk_size: {chunk_size}");
    println!("  workers:    {workers}");
    println!("  level:      {level}");
    println!();

    // In-memory setup, measures pure pipeline throughput.
    let store = Arc::new(MemoryStore::new());
    let pipeline = ChunkPipeline::new(
        store.clone(),
        ChunkCodec::new(level),
        workers,
        CancellationToken::new(),
    );
    let chunker = Chunker::new(chunk_size).context("invalid chunk size")?;

    let data = generate_bench_data(size);
    let total_bytes = count as u64 * size as u64;

    // --- Write ---
    print!("Storing {count} files... ");
    let start = Instant::now();
    let mut stored = Vec::with_capacity(count);
    for _ in 0..count {
        stored.push(pipeline.write(chunker.stream(&data[..])).await?);
    }
    let write_dur = start.elapsed();
    let write_mbs = total_bytes as f64 / write_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({write_mbs:.1} MB/s)", write_dur.as_secs_f64());

    // --- Read ---
    print!("Loading {count} files... ");
    let start = Instant::now();
    for chunks in &stored {
        let restored = pipeline.read(chunks).await?;
        anyhow::ensure!(restored.len() == size, "benchmark reassembled a short file");
    }
    let read_dur = start.elapsed();
    let read_mbs = total_bytes as f64 / read_dur.as_secs_f64() / 1_048_576.0;
    println!("{:.2}s ({read_mbs:.1} MB/s)", read_dur.as_secs_f64());

    println!();
    println!("Summary:");
    println!("  Store throughput: {write_mbs:.1} MB/s");
    println!("  Load throughput:  {read_mbs:.1} MB/s");
    println!(
        "  Total data:       {:.1} MB ({:.1}% after compression)",
        total_bytes as f64 / 1_048_576.0,
        ratio(store.used_bytes(), total_bytes)
    );

    Ok(())
}

/// Generate deterministic test data for benchmarking.
fn generate_bench_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

/// Human-readable byte count using binary units.
fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// `part` as a percentage of `whole`; zero for an empty whole.
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
