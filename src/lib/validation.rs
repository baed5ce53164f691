//! Input validation utilities
//!
//! Validation helpers for command-line parameters and file paths. Every
//! helper reports failures as a [`PipelineError`] so configuration problems
//! surface before any thread is started.

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::errors::{PipelineError, Result};
use crate::transform::{MAX_COMPRESSION_LEVEL, MIN_COMPRESSION_LEVEL};

/// Validate that a file exists
///
/// # Errors
/// Returns a [`PipelineError::SourceRead`] if the path does not exist or is not a file
///
/// # Example
/// ```
/// use chunkpress_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bin", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(PipelineError::SourceRead {
            path: path_ref.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("{description} does not exist or is not a regular file"),
            ),
        });
    }
    Ok(())
}

/// Validate that input and output refer to different paths
///
/// # Errors
/// Returns an error if both paths are the same
///
/// # Example
/// ```
/// use chunkpress_lib::validation::validate_distinct_paths;
///
/// validate_distinct_paths("in.bin", "in.bin.ch").unwrap();
/// assert!(validate_distinct_paths("in.bin", "in.bin").is_err());
/// ```
pub fn validate_distinct_paths<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<()> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(PipelineError::config(
            "output",
            format!("Output must differ from input: {}", output.display()),
        ));
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use chunkpress_lib::validation::validate_positive;
///
/// validate_positive(3, "threads").unwrap();
/// assert!(validate_positive(0, "threads").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(PipelineError::config(name, format!("Must be positive (> 0), got: {value}")));
    }
    Ok(())
}

/// Validate that a value lies in `min..=max`
///
/// # Errors
/// Returns an error if the value is outside the range
///
/// # Example
/// ```
/// use chunkpress_lib::validation::validate_range;
///
/// validate_range(4, 1, 8, "threads").unwrap();
/// assert!(validate_range(9, 1, 8, "threads").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_range<T: Ord + Display>(value: T, min: T, max: T, name: &str) -> Result<()> {
    if value < min || value > max {
        return Err(PipelineError::config(
            name,
            format!("Must be between {min} and {max}, got: {value}"),
        ));
    }
    Ok(())
}

/// Validate a deflate compression level
///
/// # Errors
/// Returns an error unless the level is in `1..=12`
pub fn validate_compression_level(level: u32) -> Result<()> {
    validate_range(level, MIN_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL, "compression-level")
}
