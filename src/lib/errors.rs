//! Custom error types for chunkpress operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for chunkpress operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for pipeline operations.
///
/// Every variant except [`PipelineError::Config`] is fatal to a run: the
/// orchestrator stops and nothing is written to the output sink.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration value, detected before any thread starts
    #[error("Invalid parameter '{parameter}': {reason}")]
    Config {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// The input stream could not be opened or read
    #[error("Failed to read source '{path}': {source}")]
    SourceRead {
        /// Path (or description) of the source
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A worker's transform failed for one chunk
    #[error("Transform '{transform}' failed on chunk {index}: {reason}")]
    Transform {
        /// Sequence index of the failing chunk
        index: u64,
        /// Name of the transform that failed
        transform: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// Collected results did not cover `[0, total)` exactly once
    #[error("Reassembly failed: {reason}")]
    Reassembly {
        /// Description of the first inconsistency found
        reason: String,
    },

    /// Thread or buffer allocation failed
    #[error("Failed to allocate {what}: {source}")]
    Allocation {
        /// What was being allocated
        what: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked
    #[error("Worker {worker} panicked")]
    WorkerPanicked {
        /// Worker number
        worker: usize,
    },

    /// The archive container could not be opened or is malformed
    #[error("Invalid archive '{path}': {source}")]
    Archive {
        /// Path to the archive
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Writing the ordered output failed
    #[error("Failed to write output '{path}': {source}")]
    SinkWrite {
        /// Path (or description) of the sink
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Build a [`PipelineError::Config`] error.
    pub fn config(parameter: &str, reason: impl Into<String>) -> Self {
        Self::Config { parameter: parameter.to_string(), reason: reason.into() }
    }

    /// The sequence index of the chunk that caused this error, if any.
    #[must_use]
    pub fn chunk_index(&self) -> Option<u64> {
        match self {
            Self::Transform { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// True for configuration errors, which are raised before launch.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
