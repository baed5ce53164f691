#![deny(unsafe_code)]
// Clippy lint configuration for CI
// - cast_*: byte counts move between usize, u64 and f64 for logging
// - missing_*_doc: documentation improvements tracked separately
// - needless_pass_by_value: chunks move through the queues by value
// - items_after_statements: some test code uses late item declarations
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::redundant_closure_for_method_calls,
    clippy::uninlined_format_args
)]

//! # chunkpress - Parallel Chunked Compression Library
//!
//! Splits a byte stream into fixed-size chunks, transforms the chunks on a
//! pool of worker threads, and restores the original chunk order before
//! writing the result.
//!
//! ## Overview
//!
//! ### Pipeline Stages
//!
//! - **[`chunk`]** - Chunks, chunk sources over readers and archives
//! - **[`bounded_queue`]** - Fixed-capacity blocking FIFO connecting the stages
//! - **[`worker_pool`]** - Worker threads applying a transform to each chunk
//! - **[`reassembler`]** - Restores sequence order to completed chunks
//! - **[`sink`]** - Destinations for the ordered output
//! - **[`pipeline`]** - Wires the stages together and owns their lifecycle
//!
//! ### Transforms
//!
//! - **[`transform`]** - The `ChunkTransform` trait plus identity and gzip transforms
//!
//! ### Utilities
//!
//! - **[`errors`]** - The `PipelineError` type
//! - **[`validation`]** - Parameter and file validation
//! - **[`progress`]** - Progress tracking and logging
//! - **[`logging`]** - Formatting helpers and run summaries
//!
//! ## Quick Start
//!
//! ### Compressing and Restoring a File
//!
//! ```no_run
//! use chunkpress_lib::pipeline::{PipelineConfig, compress_file, decompress_file};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::new(4).with_chunk_size(4 << 20);
//! compress_file("data.bin", "data.bin.ch", 6, &config)?;
//! decompress_file("data.bin.ch", "data.restored.bin", &config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Running a Custom Transform
//!
//! ```
//! use chunkpress_lib::chunk::{Chunk, ChunkSource};
//! use chunkpress_lib::pipeline::{PipelineConfig, run_pipeline};
//! use chunkpress_lib::sink::BufferSink;
//!
//! # fn main() -> anyhow::Result<()> {
//! let data = b"hello, chunked world";
//! let source = ChunkSource::new(&data[..], 4)?.with_len(data.len() as u64);
//! let total = source.expected_chunks().unwrap_or_default();
//!
//! let upper = |chunk: Chunk| -> std::io::Result<Chunk> {
//!     Ok(Chunk::new(chunk.index(), chunk.data().to_ascii_uppercase()))
//! };
//!
//! let mut sink = BufferSink::new();
//! run_pipeline(source, total, &upper, &mut sink, &PipelineConfig::new(2))?;
//! assert_eq!(sink.data(), b"HELLO, CHUNKED WORLD");
//! # Ok(())
//! # }
//! ```

pub mod bounded_queue;
pub mod chunk;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod reassembler;
pub mod sink;
pub mod transform;
pub mod validation;
pub mod worker_pool;

pub use bounded_queue::{BoundedQueue, Closed};
pub use chunk::{Chunk, ChunkSource};
pub use errors::{PipelineError, Result};
pub use pipeline::{PipelineConfig, PipelineSummary, run_pipeline};
pub use transform::ChunkTransform;
