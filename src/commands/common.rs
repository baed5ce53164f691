//! Common CLI options shared across commands.
//!
//! Argument groups composed into command structs using `#[command(flatten)]`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;

use chunkpress_lib::pipeline::{
    DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, PipelineConfig,
};
use chunkpress_lib::transform::DEFAULT_COMPRESSION_LEVEL;
use chunkpress_lib::validation::validate_file_exists;

/// Input file and optional output file.
#[derive(Debug, Clone, Args)]
pub struct IoOptions {
    /// Input file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file (derived from the input name when omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl IoOptions {
    /// Validates that the input file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self, description: &str) -> anyhow::Result<()> {
        validate_file_exists(&self.input, description)?;
        Ok(())
    }

    /// The explicit output path, or the one produced by `derive` from the input.
    ///
    /// # Errors
    ///
    /// Returns any error from `derive`.
    pub fn output_or<F>(&self, derive: F) -> anyhow::Result<PathBuf>
    where
        F: FnOnce(&Path) -> chunkpress_lib::errors::Result<PathBuf>,
    {
        match &self.output {
            Some(output) => Ok(output.clone()),
            None => Ok(derive(&self.input)?),
        }
    }
}

/// Worker, chunking and queue options for the parallel pipeline.
#[derive(Debug, Clone, Args)]
pub struct PipelineOptions {
    /// Number of worker threads.
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    /// Chunk size in bytes; accepts K, M and G suffixes (e.g. 512K, 4M).
    #[arg(long = "chunk-size", default_value = "1M", value_parser = parse_size)]
    pub chunk_size: usize,

    /// Capacity of the input and output queues, in chunks.
    #[arg(long = "queue-size", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_size: usize,

    /// Artificial delay in milliseconds before each chunk is transformed.
    ///
    /// Only useful for testing thread interleavings.
    #[arg(long = "delay-ms", hide = true)]
    pub delay_ms: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_size: DEFAULT_QUEUE_CAPACITY,
            delay_ms: None,
        }
    }
}

impl PipelineOptions {
    /// Build the library configuration from these options.
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.threads)
            .with_chunk_size(self.chunk_size)
            .with_queue_capacity(self.queue_size)
            .with_delay(self.delay_ms.map(Duration::from_millis))
    }

    /// One-line description for logging.
    pub fn log_message(&self) -> String {
        format!(
            "Using {} worker threads, {} byte chunks, queue size {}",
            self.threads, self.chunk_size, self.queue_size
        )
    }
}

/// Options for output compression.
#[derive(Debug, Clone, Args)]
pub struct CompressionOptions {
    /// Deflate compression level (1-12).
    ///
    /// Level 1 is fastest with larger files.
    /// Level 12 produces smallest files but is slowest.
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    pub compression_level: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self { compression_level: DEFAULT_COMPRESSION_LEVEL }
    }
}

/// Parse a byte count with an optional binary `K`, `M` or `G` suffix.
///
/// # Errors
///
/// Returns a message if the number is malformed, zero, or overflows.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&s[..s.len() - 1], 10),
        Some('M') => (&s[..s.len() - 1], 20),
        Some('G') => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };

    let value: usize = digits.parse().map_err(|e| format!("invalid size '{s}': {e}"))?;
    if value == 0 {
        return Err(format!("size must be > 0, got '{s}'"));
    }
    value
        .checked_shl(shift)
        .filter(|v| v >> shift == value)
        .ok_or_else(|| format!("size '{s}' is too large"))
}
