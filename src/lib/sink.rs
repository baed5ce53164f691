//! Destinations for reassembled chunks.
//!
//! A [`ChunkSink`] receives the complete, ordered chunk sequence once every
//! pipeline stage has succeeded. File-backed sinks write to a temporary
//! sibling path and rename it into place when done, so a failed write never
//! leaves a truncated output behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chunkpress_archive::ArchiveWriter;
use log::debug;

use crate::chunk::Chunk;

/// Suffix of the temporary file written before the final rename.
const PARTIAL_SUFFIX: &str = ".partial";

/// Receives the ordered output of a pipeline run.
pub trait ChunkSink {
    /// Path (or description) used in logs and error messages.
    fn label(&self) -> &Path;

    /// Write every chunk, in the order given.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying destination.
    fn write_ordered(&mut self, chunks: &[Chunk]) -> io::Result<()>;
}

/// Writes chunk payloads back to back into a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// A sink that will create (or replace) `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl ChunkSink for FileSink {
    fn label(&self) -> &Path {
        &self.path
    }

    fn write_ordered(&mut self, chunks: &[Chunk]) -> io::Result<()> {
        write_via_partial(&self.path, |file| {
            let mut writer = BufWriter::new(file);
            for chunk in chunks {
                writer.write_all(chunk.data())?;
            }
            writer.flush()
        })
    }
}

/// Appends each chunk payload as one record of a chunk archive.
#[derive(Debug, Clone)]
pub struct ArchiveSink {
    path: PathBuf,
}

impl ArchiveSink {
    /// A sink that will create (or replace) the archive at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl ChunkSink for ArchiveSink {
    fn label(&self) -> &Path {
        &self.path
    }

    fn write_ordered(&mut self, chunks: &[Chunk]) -> io::Result<()> {
        write_via_partial(&self.path, |file| {
            let mut writer = ArchiveWriter::new(BufWriter::new(file))?;
            for chunk in chunks {
                writer.append_chunk(chunk.data())?;
            }
            debug!(
                "Archived {} chunks in {} record bytes",
                writer.count(),
                writer.bytes_written()
            );
            writer.finish()?.flush()
        })
    }
}

/// Collects chunk payloads back to back in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    label: PathBuf,
    data: Vec<u8>,
}

impl BufferSink {
    /// An empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self { label: PathBuf::from("<memory>"), data: Vec::new() }
    }

    /// The bytes written so far.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the sink and return its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ChunkSink for BufferSink {
    fn label(&self) -> &Path {
        &self.label
    }

    fn write_ordered(&mut self, chunks: &[Chunk]) -> io::Result<()> {
        self.data.reserve(chunks.iter().map(Chunk::len).sum());
        for chunk in chunks {
            self.data.extend_from_slice(chunk.data());
        }
        Ok(())
    }
}

/// Path of the temporary file used while writing `path`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Run `write` against a temporary sibling of `path`, then rename it over `path`.
fn write_via_partial<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(File) -> io::Result<()>,
{
    let partial = partial_path(path);
    let result = File::create(&partial).and_then(write).and_then(|()| fs::rename(&partial, path));

    if result.is_err() {
        // Cleanup failure is ignored; the write error is reported.
        let _ = fs::remove_file(&partial);
    } else {
        debug!("Wrote {}", path.display());
    }
    result
}
