//! Sequence-numbered chunks and the sources that produce them.
//!
//! A [`Chunk`] is the unit of parallel work: a slice of the input stream
//! tagged with its position. Sources are plain iterators so the orchestrator
//! can consume them lazily while loading the input queue:
//!
//! - [`ChunkSource`] splits any [`Read`] into fixed-size chunks
//! - [`ArchiveChunks`] yields the stored chunks of an archive, in index order
//!
//! # Example
//!
//! ```
//! use chunkpress_lib::chunk::ChunkSource;
//!
//! let data: Vec<u8> = (0..10).collect();
//! let chunks: Vec<_> = ChunkSource::new(&data[..], 3)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! let sizes: Vec<_> = chunks.iter().map(|c| c.len()).collect();
//! assert_eq!(sizes, vec![3, 3, 3, 1]);
//! assert_eq!(chunks[3].index(), 3);
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use chunkpress_archive::ArchiveReader;

use crate::errors::{PipelineError, Result};

/// Label used in error messages for sources without a path.
const STREAM_LABEL: &str = "<stream>";

/// A numbered slice of a byte stream.
///
/// The payload length may be shorter than the nominal chunk size for the
/// final chunk of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: u64,
    data: Vec<u8>,
}

impl Chunk {
    /// Create a chunk with the given sequence index and payload.
    #[must_use]
    pub fn new(index: u64, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// Position of this chunk in the original stream.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Replace the sequence index.
    pub fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    /// The payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the chunk and return its payload.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Number of chunks a stream of `len` bytes splits into: `ceil(len / chunk_size)`.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
#[must_use]
pub fn chunk_count(len: u64, chunk_size: usize) -> u64 {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    len.div_ceil(chunk_size as u64)
}

/// Lazily splits a byte stream into sequence-numbered chunks.
///
/// Every chunk holds exactly `chunk_size` bytes except possibly the last.
/// Short reads from the underlying reader are retried, so chunk boundaries
/// depend only on `chunk_size`. The sequence is finite and can be consumed
/// only once; after the first error the iterator is exhausted.
pub struct ChunkSource<R: Read> {
    reader: R,
    chunk_size: usize,
    next_index: u64,
    /// Stream length, when known up front.
    len: Option<u64>,
    label: PathBuf,
    done: bool,
}

impl<R: Read> ChunkSource<R> {
    /// Create a source over `reader`.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Config`] if `chunk_size` is zero.
    pub fn new(reader: R, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::config("chunk-size", "chunk size must be >= 1"));
        }
        Ok(Self {
            reader,
            chunk_size,
            next_index: 0,
            len: None,
            label: PathBuf::from(STREAM_LABEL),
            done: false,
        })
    }

    /// Record the stream length so the chunk count is known before reading.
    #[must_use]
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    /// Set the path reported in read errors.
    #[must_use]
    pub fn with_label<P: Into<PathBuf>>(mut self, label: P) -> Self {
        self.label = label.into();
        self
    }

    /// Number of chunks this source will yield, if the stream length is known.
    #[must_use]
    pub fn expected_chunks(&self) -> Option<u64> {
        self.len.map(|len| chunk_count(len, self.chunk_size))
    }

    /// The nominal chunk size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn read_error(&mut self, source: io::Error) -> PipelineError {
        self.done = true;
        PipelineError::SourceRead { path: self.label.clone(), source }
    }
}

impl ChunkSource<BufReader<File>> {
    /// Open a file and split it into chunks; the length comes from file metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::SourceRead`] if the file cannot be opened or
    /// its metadata read, or a [`PipelineError::Config`] if `chunk_size` is zero.
    pub fn from_path<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let open = || -> io::Result<(File, u64)> {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            Ok((file, len))
        };
        let (file, len) = open()
            .map_err(|source| PipelineError::SourceRead { path: path.to_path_buf(), source })?;

        Ok(Self::new(BufReader::new(file), chunk_size)?.with_len(len).with_label(path))
    }
}

impl<R: Read> Iterator for ChunkSource<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Some(Err(self.read_error(e))),
            }
        }

        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < self.chunk_size {
            // A short chunk means the reader hit end of stream.
            self.done = true;
            data.truncate(filled);
        }

        let chunk = Chunk::new(self.next_index, data);
        self.next_index += 1;
        Some(Ok(chunk))
    }
}

/// Yields the chunks stored in an archive, in index order.
///
/// Chunk `i` carries sequence index `i`.
pub struct ArchiveChunks<R: Read + Seek> {
    reader: ArchiveReader<R>,
    next: usize,
    label: PathBuf,
    done: bool,
}

impl<R: Read + Seek> ArchiveChunks<R> {
    /// Wrap an open archive reader.
    pub fn new<P: Into<PathBuf>>(reader: ArchiveReader<R>, label: P) -> Self {
        Self { reader, next: 0, label: label.into(), done: false }
    }

    /// Number of chunks in the archive.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.reader.count() as u64
    }
}

impl ArchiveChunks<BufReader<File>> {
    /// Open an archive file.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Archive`] if the file cannot be opened or
    /// is not a valid archive.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = ArchiveReader::open(path)
            .map_err(|source| PipelineError::Archive { path: path.to_path_buf(), source })?;
        Ok(Self::new(reader, path))
    }
}

impl<R: Read + Seek> Iterator for ArchiveChunks<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next >= self.reader.count() {
            return None;
        }

        let index = self.next;
        self.next += 1;
        match self.reader.read_chunk(index) {
            Ok(data) => Some(Ok(Chunk::new(index as u64, data))),
            Err(source) => {
                self.done = true;
                Some(Err(PipelineError::SourceRead { path: self.label.clone(), source }))
            }
        }
    }
}
