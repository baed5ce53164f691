//! Random-access chunk archive reader.
//!
//! The reader validates the header and footer up front and loads the offset
//! index, after which any chunk can be read by index with a single seek.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::{
    ARCHIVE_MAGIC, ARCHIVE_VERSION, FOOTER_SIZE, HEADER_SIZE, INDEX_MAGIC, RECORD_PREFIX_SIZE,
};

/// Reads chunks from an archive container by index.
#[derive(Debug)]
pub struct ArchiveReader<R: Read + Seek> {
    inner: R,
    /// Absolute offset of each record.
    offsets: Vec<u64>,
    /// First byte past the record area (start of the index).
    records_end: u64,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a valid archive.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Validate the container and load its index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the magic, version, or index is malformed,
    /// or any I/O error from the underlying reader.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < HEADER_SIZE + FOOTER_SIZE {
            return Err(invalid_data(format!("Archive too short: {file_len} bytes")));
        }

        inner.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        inner.read_exact(&mut header)?;
        if header[..4] != ARCHIVE_MAGIC {
            return Err(invalid_data(format!(
                "Invalid archive magic: expected {:?}, got {:?}",
                ARCHIVE_MAGIC,
                &header[..4]
            )));
        }
        if header[4] != ARCHIVE_VERSION {
            return Err(invalid_data(format!(
                "Unsupported archive version {} (expected {ARCHIVE_VERSION})",
                header[4]
            )));
        }

        inner.seek(SeekFrom::Start(file_len - FOOTER_SIZE))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        inner.read_exact(&mut footer)?;
        if footer[8..] != INDEX_MAGIC {
            return Err(invalid_data("Archive index missing or truncated".to_string()));
        }
        let count = read_u64(&footer[..8]);

        let index_size = count
            .checked_mul(8)
            .filter(|size| *size <= file_len - HEADER_SIZE - FOOTER_SIZE)
            .ok_or_else(|| invalid_data(format!("Archive index of {count} chunks does not fit")))?;
        let records_end = file_len - FOOTER_SIZE - index_size;

        inner.seek(SeekFrom::Start(records_end))?;
        let mut index = vec![0u8; index_size as usize];
        inner.read_exact(&mut index)?;

        let offsets: Vec<u64> = index.chunks_exact(8).map(read_u64).collect();
        if let Some(bad) = offsets.iter().find(|&&offset| {
            offset < HEADER_SIZE
                || offset.checked_add(RECORD_PREFIX_SIZE).is_none_or(|end| end > records_end)
        }) {
            return Err(invalid_data(format!("Archive record offset {bad} out of range")));
        }

        Ok(Self { inner, offsets, records_end })
    }

    /// Number of chunks in the archive.
    #[must_use]
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Read the payload of chunk `index`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `index` is out of range, `InvalidData` if the
    /// record overruns the record area, or any I/O error.
    pub fn read_chunk(&mut self, index: usize) -> io::Result<Vec<u8>> {
        let offset = *self.offsets.get(index).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Chunk index {index} out of range (archive has {})", self.offsets.len()),
            )
        })?;

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut prefix = [0u8; RECORD_PREFIX_SIZE as usize];
        self.inner.read_exact(&mut prefix)?;
        let len = u32::from_le_bytes(prefix);

        let end = offset
            .checked_add(RECORD_PREFIX_SIZE)
            .and_then(|start| start.checked_add(u64::from(len)));
        if end.is_none_or(|end| end > self.records_end) {
            return Err(invalid_data(format!(
                "Chunk {index} of {len} bytes overruns the record area"
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload)?;
        Ok(payload)
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
