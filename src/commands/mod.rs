//! CLI command implementations for chunkpress.
//!
//! - [`compress`] - Split a file into chunks and compress them in parallel
//! - [`decompress`] - Restore the original file from a chunk archive

pub mod command;
pub mod common;
pub mod compress;
pub mod decompress;
