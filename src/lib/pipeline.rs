//! Pipeline orchestration.
//!
//! [`run_pipeline`] wires a chunk source, two [`BoundedQueue`]s, a
//! [`WorkerPool`] and a [`Reassembler`] together:
//!
//! ```text
//! source ──▶ input queue ──▶ workers (transform) ──▶ output queue ──▶ reassembler ──▶ sink
//! ```
//!
//! The source is loaded from the calling thread while the workers run and a
//! scoped reassembler thread drains the output queue, so the queue capacity
//! bounds memory in flight rather than the size of the input. Closing a queue
//! is the end-of-stream signal for the stage reading from it.
//!
//! A run either writes the complete, ordered output or writes nothing.
//! When several stages fail the reported error is, in order of precedence,
//! the first transform failure (or worker panic), then the source read
//! error, then the reassembly problem.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::bounded_queue::BoundedQueue;
use crate::chunk::{ArchiveChunks, Chunk, ChunkSource};
use crate::errors::{PipelineError, Result};
use crate::logging::{OperationTimer, format_bytes, format_count, log_pipeline_summary};
use crate::reassembler::{DEFAULT_PROGRESS_INTERVAL, Reassembler};
use crate::sink::{ArchiveSink, ChunkSink, FileSink};
use crate::transform::{ChunkTransform, Codec};
use crate::validation::{
    validate_distinct_paths, validate_file_exists, validate_positive, validate_range,
};
use crate::worker_pool::{AbortSignal, PoolStats, WorkerContext, WorkerPool};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 3;

/// Default chunk size in bytes (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Default capacity of each queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Largest accepted chunk size (1 GiB); compressed records must fit a `u32` length.
pub const MAX_CHUNK_SIZE: usize = 1 << 30;

/// File extension of compressed archives.
pub const ARCHIVE_EXTENSION: &str = "ch";

/// Tuning parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Size of each chunk read from the source, in bytes.
    pub chunk_size: usize,
    /// Capacity of the input and output queues.
    pub queue_capacity: usize,
    /// Artificial delay before each transform, for reproducible interleavings.
    pub delay: Option<Duration>,
    /// Chunks between reassembly progress log lines.
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            delay: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// A configuration with the given worker count and defaults elsewhere.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self { workers, ..Self::default() }
    }

    /// Set the chunk size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the capacity of both queues.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Sleep `delay` before every transform.
    #[must_use]
    pub fn with_delay(mut self, delay: Option<Duration>) -> Self {
        self.delay = delay;
        self
    }

    /// Set the reassembly progress interval.
    #[must_use]
    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Config`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        validate_positive(self.workers, "threads")?;
        validate_range(self.chunk_size, 1, MAX_CHUNK_SIZE, "chunk-size")?;
        validate_positive(self.queue_capacity, "queue-size")?;
        validate_positive(self.progress_interval, "progress-interval")?;
        Ok(())
    }
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Chunks written to the sink.
    pub chunks: u64,
    /// Payload bytes read from the source.
    pub bytes_in: u64,
    /// Payload bytes written to the sink.
    pub bytes_out: u64,
    /// Worker threads used.
    pub workers: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

/// Outcome of each concurrent stage, kept apart so errors can be ranked.
struct StageResults {
    pool: Result<PoolStats>,
    loaded: Result<u64>,
    ordered: Result<Vec<Chunk>>,
}

/// Transform `total` chunks from `source` and write them, in order, to `sink`.
///
/// `total` must equal the number of chunks the source yields; any mismatch
/// is reported as a [`PipelineError::Reassembly`].
///
/// # Errors
///
/// Returns a [`PipelineError::Config`] before any thread starts if `config`
/// is invalid, and otherwise the highest-precedence stage error. The sink is
/// only written when every stage succeeded.
pub fn run_pipeline<I>(
    source: I,
    total: u64,
    transform: &dyn ChunkTransform,
    sink: &mut dyn ChunkSink,
    config: &PipelineConfig,
) -> Result<PipelineSummary>
where
    I: IntoIterator<Item = Result<Chunk>>,
{
    config.validate()?;

    let timer = OperationTimer::new(&format!(
        "Running '{}' over {} chunks with {} workers",
        transform.name(),
        format_count(total),
        config.workers
    ));

    let input = BoundedQueue::new(config.queue_capacity)?;
    let output = BoundedQueue::new(config.queue_capacity)?;
    let signal = AbortSignal::new();
    let reassembler = Reassembler::new(total).with_progress_interval(config.progress_interval);
    let ctx = WorkerContext {
        input: &input,
        output: &output,
        transform,
        signal: &signal,
        delay: config.delay,
    };

    let stages = thread::scope(|scope| -> Result<StageResults> {
        let collector = thread::Builder::new()
            .name("chunkpress-reassembler".to_string())
            .spawn_scoped(scope, || reassembler.collect(&output))
            .map_err(|source| PipelineError::Allocation {
                what: "reassembler thread".to_string(),
                source,
            })?;

        let pool = match WorkerPool::start(scope, config.workers, ctx) {
            Ok(pool) => pool,
            Err(e) => {
                output.close();
                let _ = collector.join();
                return Err(e);
            }
        };

        let loaded = load_source(source, &input, &signal);
        let pool = pool.join();
        output.close();
        let ordered = collector.join().unwrap_or_else(|_| {
            Err(PipelineError::Reassembly { reason: "reassembler thread panicked".to_string() })
        });

        Ok(StageResults { pool, loaded, ordered })
    })?;

    let stats = stages.pool?;
    let bytes_in = stages.loaded?;
    let ordered = stages.ordered?;

    sink.write_ordered(&ordered)
        .map_err(|source| PipelineError::SinkWrite { path: sink.label().to_path_buf(), source })?;

    let summary = PipelineSummary {
        chunks: ordered.len() as u64,
        bytes_in,
        bytes_out: ordered.iter().map(|chunk| chunk.len() as u64).sum(),
        workers: stats.workers(),
        elapsed: timer.elapsed(),
    };
    timer.log_completion(summary.chunks);
    log_pipeline_summary(&summary);
    Ok(summary)
}

/// Push every source chunk onto `input`, then close it.
///
/// Returns the number of payload bytes loaded. Loading stops early if the
/// workers closed the queue after a failure.
fn load_source<I>(source: I, input: &BoundedQueue<Chunk>, signal: &AbortSignal) -> Result<u64>
where
    I: IntoIterator<Item = Result<Chunk>>,
{
    let mut bytes = 0u64;
    let mut result = Ok(());

    for item in source {
        match item {
            Ok(chunk) => {
                let len = chunk.len() as u64;
                if input.put(chunk).is_err() {
                    debug!("Input queue closed while loading; stopping");
                    break;
                }
                bytes += len;
            }
            Err(e) => {
                warn!("Stopping after source error: {e}");
                signal.cancel();
                result = Err(e);
                break;
            }
        }
    }

    input.close();
    result.map(|()| bytes)
}

/// Compress `input` into a chunk archive at `output`.
///
/// Each chunk becomes one gzip member stored as one archive record.
///
/// # Errors
///
/// Returns any [`PipelineError`] from validation, reading, compressing or writing.
pub fn compress_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    compression_level: u32,
    config: &PipelineConfig,
) -> Result<PipelineSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    validate_file_exists(input, "Input file")?;
    validate_distinct_paths(input, output)?;
    config.validate()?;
    let transform = Codec::Compress.transform(compression_level)?;

    let source = ChunkSource::from_path(input, config.chunk_size)?;
    let total = source.expected_chunks().unwrap_or_default();
    info!(
        "Compressing {} ({} chunks of up to {}) to {}",
        input.display(),
        format_count(total),
        format_bytes(source.chunk_size() as u64),
        output.display()
    );

    run_pipeline(source, total, transform.as_ref(), &mut ArchiveSink::new(output), config)
}

/// Decompress the chunk archive at `input` into `output`.
///
/// # Errors
///
/// Returns any [`PipelineError`] from validation, reading, decompressing or writing.
pub fn decompress_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &PipelineConfig,
) -> Result<PipelineSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    validate_file_exists(input, "Input archive")?;
    validate_distinct_paths(input, output)?;
    config.validate()?;
    let transform = Codec::Decompress.transform(0)?;

    let source = ArchiveChunks::open(input)?;
    let total = source.total();
    info!(
        "Decompressing {} ({} chunks) to {}",
        input.display(),
        format_count(total),
        output.display()
    );

    run_pipeline(source, total, transform.as_ref(), &mut FileSink::new(output), config)
}

/// Output path for compressing `input`: `<input>.ch`.
#[must_use]
pub fn compressed_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    PathBuf::from(name)
}

/// Output path for decompressing `input`: the path with its `.ch` extension removed.
///
/// # Errors
///
/// Returns a [`PipelineError::Config`] if `input` does not end in `.ch`.
pub fn decompressed_path(input: &Path) -> Result<PathBuf> {
    let has_extension = input.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION);
    let stem_is_empty = input.file_stem().is_none_or(|stem| stem.is_empty());
    if !has_extension || stem_is_empty {
        return Err(PipelineError::config(
            "output",
            format!(
                "cannot derive an output name from '{}' (expected a '.{ARCHIVE_EXTENSION}' file); \
                 pass --output explicitly",
                input.display()
            ),
        ));
    }
    Ok(input.with_extension(""))
}
