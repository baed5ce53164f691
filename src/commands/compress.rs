//! Compress a file into a chunk archive using parallel workers.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use chunkpress_lib::pipeline::{compress_file, compressed_path};
use chunkpress_lib::validation::validate_compression_level;

use crate::commands::command::Command;
use crate::commands::common::{CompressionOptions, IoOptions, PipelineOptions};

/// Split a file into fixed-size chunks and compress them in parallel.
#[derive(Debug, Parser)]
#[command(
    name = "compress",
    about = "\x1b[38;5;72m[ARCHIVE]\x1b[0m        \x1b[36mCompress a file into a chunk archive\x1b[0m",
    long_about = r#"
Compress a file into a chunk archive using a pool of worker threads.

The input is split into fixed-size chunks. Each chunk is compressed independently into a
gzip member by one of the workers, and the results are written to the archive in their
original order, one record per chunk. The output defaults to the input path with a '.ch'
extension appended.

Example usage:
  chunkpress compress -i data.bin
  chunkpress compress -i data.bin -o data.ch --threads 8 --chunk-size 4M
  chunkpress compress -i big.bin --compression-level 12 --queue-size 16
"#
)]
pub struct Compress {
    /// Input/output options
    #[command(flatten)]
    pub io: IoOptions,

    /// Worker and chunking options
    #[command(flatten)]
    pub pipeline: PipelineOptions,

    /// Compression options
    #[command(flatten)]
    pub compression: CompressionOptions,
}

impl Command for Compress {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        self.io.validate("Input file")?;
        validate_compression_level(self.compression.compression_level)?;

        let output = self.io.output_or(|input| Ok(compressed_path(input)))?;
        let config = self.pipeline.to_config();
        config.validate()?;

        info!("Starting Compress");
        info!("Input: {}", self.io.input.display());
        info!("Output: {}", output.display());
        info!("{}", self.pipeline.log_message());
        info!("Compression level: {}", self.compression.compression_level);

        compress_file(&self.io.input, &output, self.compression.compression_level, &config)
            .with_context(|| format!("Failed to compress {}", self.io.input.display()))?;

        info!("Compress complete");
        Ok(())
    }
}
