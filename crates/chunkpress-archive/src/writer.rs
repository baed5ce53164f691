//! Append-only chunk archive writer.
//!
//! Payloads are written as length-prefixed records in call order. The offset
//! of every record is remembered and emitted as a trailing index by
//! [`ArchiveWriter::finish`], which makes the archive readable by index
//! without scanning the records.

use std::io::{self, Write};

use crate::{FOOTER_SIZE, HEADER_SIZE, INDEX_MAGIC, RECORD_PREFIX_SIZE, header_bytes};

/// Writes chunks into an archive container.
///
/// # Usage
///
/// ```
/// use chunkpress_archive::{ArchiveReader, ArchiveWriter};
/// use std::io::Cursor;
///
/// let mut writer = ArchiveWriter::new(Vec::new()).unwrap();
/// writer.append_chunk(b"first").unwrap();
/// writer.append_chunk(b"second").unwrap();
/// let bytes = writer.finish().unwrap();
///
/// let mut reader = ArchiveReader::new(Cursor::new(bytes)).unwrap();
/// assert_eq!(reader.count(), 2);
/// assert_eq!(reader.read_chunk(1).unwrap(), b"second");
/// ```
pub struct ArchiveWriter<W: Write> {
    inner: W,
    /// Absolute offset of the next byte to be written.
    position: u64,
    /// Absolute offset of each record, in append order.
    offsets: Vec<u64>,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer and emit the archive header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(&header_bytes())?;
        Ok(Self { inner, position: HEADER_SIZE, offsets: Vec::new() })
    }

    /// Append one chunk payload. The call order determines the chunk index.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is larger than `u32::MAX` bytes or
    /// the underlying writer fails.
    pub fn append_chunk(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Chunk of {} bytes exceeds the archive record limit", payload.len()),
            )
        })?;

        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.offsets.push(self.position);
        self.position += RECORD_PREFIX_SIZE + u64::from(len);
        Ok(())
    }

    /// Number of chunks appended so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Number of bytes written so far (header and records, no index yet).
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.position
    }

    /// Write the index and footer, flush, and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn finish(mut self) -> io::Result<W> {
        for offset in &self.offsets {
            self.inner.write_all(&offset.to_le_bytes())?;
        }
        self.inner.write_all(&(self.offsets.len() as u64).to_le_bytes())?;
        self.inner.write_all(&INDEX_MAGIC)?;
        self.inner.flush()?;

        log::debug!(
            "Finished archive: {} chunks, {} bytes",
            self.offsets.len(),
            self.position + 8 * self.offsets.len() as u64 + FOOTER_SIZE
        );
        Ok(self.inner)
    }
}
