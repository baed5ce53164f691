//! Restore a file from a chunk archive using parallel workers.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use chunkpress_lib::pipeline::{decompress_file, decompressed_path};

use crate::commands::command::Command;
use crate::commands::common::{IoOptions, PipelineOptions};

/// Decompress every chunk of an archive in parallel and write them back in order.
#[derive(Debug, Parser)]
#[command(
    name = "decompress",
    about = "\x1b[38;5;72m[ARCHIVE]\x1b[0m        \x1b[36mRestore a file from a chunk archive\x1b[0m",
    long_about = r#"
Restore the original file from a chunk archive produced by 'chunkpress compress'.

Each archive record is inflated independently by one of the workers and the results are
written back to back in their original order. Without --output the '.ch' extension is
stripped from the input path; inputs without that extension require --output.

Example usage:
  chunkpress decompress -i data.bin.ch
  chunkpress decompress -i data.ch -o data.bin --threads 8
"#
)]
pub struct Decompress {
    /// Input/output options
    #[command(flatten)]
    pub io: IoOptions,

    /// Worker options
    #[command(flatten)]
    pub pipeline: PipelineOptions,
}

impl Command for Decompress {
    fn execute(&self, command_line: &str) -> Result<()> {
        debug!("Command line: {command_line}");
        self.io.validate("Input archive")?;

        let output = self.io.output_or(decompressed_path)?;
        let config = self.pipeline.to_config();
        config.validate()?;

        info!("Starting Decompress");
        info!("Input: {}", self.io.input.display());
        info!("Output: {}", output.display());
        info!("{}", self.pipeline.log_message());

        decompress_file(&self.io.input, &output, &config)
            .with_context(|| format!("Failed to decompress {}", self.io.input.display()))?;

        info!("Decompress complete");
        Ok(())
    }
}
