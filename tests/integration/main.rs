//! Integration tests for chunkpress.
//!
//! These tests drive the binary and the library end to end, across the
//! archive crate, the pipeline stages and the CLI.

mod helpers;
mod test_compress_command;
mod test_decompress_command;
mod test_pipeline_concurrency;
