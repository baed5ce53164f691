//! Chunk transforms applied by pipeline workers.
//!
//! A transform maps one chunk to one chunk. Transforms are shared by every
//! worker of a pool, so they must be `Send + Sync` and keep no mutable state
//! between calls. Any closure `Fn(Chunk) -> io::Result<Chunk>` is a
//! transform, which keeps test instrumentation cheap.
//!
//! The built-in transforms are:
//!
//! - [`Identity`]: passes payloads through unchanged
//! - [`DeflateCompress`]: turns each chunk into one complete gzip member
//! - [`DeflateDecompress`]: inflates one gzip member back into the chunk
//!
//! Because every compressed chunk is a full gzip member, the concatenation of
//! all compressed payloads is itself a valid multi-member gzip stream.

use std::io;

use libdeflater::{CompressionLvl, Compressor, Decompressor};

use crate::chunk::Chunk;
use crate::errors::Result;
use crate::pipeline::MAX_CHUNK_SIZE;

/// Minimum supported compression level.
pub const MIN_COMPRESSION_LEVEL: u32 = 1;

/// Maximum supported compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 12;

/// Default compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Size of the gzip member trailer (CRC32 + ISIZE).
const GZIP_FOOTER_SIZE: usize = 8;

/// Minimum size of a gzip member (10-byte header + trailer).
const GZIP_MIN_MEMBER_SIZE: usize = 10 + GZIP_FOOTER_SIZE;

/// Upper bound on the deflate expansion ratio (258 bytes per 2-bit match, rounded up).
const DEFLATE_MAX_RATIO: usize = 1032;

/// A pure mapping from one chunk to another.
///
/// The worker pool restores the sequence index of the result, so
/// implementations need not preserve it.
pub trait ChunkTransform: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Transform one chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk cannot be transformed; the pipeline
    /// aborts and reports the chunk's sequence index.
    fn transform(&self, chunk: Chunk) -> io::Result<Chunk>;
}

impl<F> ChunkTransform for F
where
    F: Fn(Chunk) -> io::Result<Chunk> + Send + Sync,
{
    fn transform(&self, chunk: Chunk) -> io::Result<Chunk> {
        self(chunk)
    }
}

/// Passes every chunk through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ChunkTransform for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn transform(&self, chunk: Chunk) -> io::Result<Chunk> {
        Ok(chunk)
    }
}

/// Compresses each chunk into a standalone gzip member using libdeflate.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompress {
    level: i32,
}

impl DeflateCompress {
    /// Create a compressor transform.
    ///
    /// The level is clamped to `1..=12`; level 1 is fastest, 12 smallest.
    #[must_use]
    pub fn new(compression_level: u32) -> Self {
        let level = compression_level.clamp(MIN_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL);
        Self { level: i32::try_from(level).unwrap_or(6) }
    }

    /// The effective compression level.
    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for DeflateCompress {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ChunkTransform for DeflateCompress {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn transform(&self, chunk: Chunk) -> io::Result<Chunk> {
        let level = CompressionLvl::new(self.level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e:?}")))?;
        // libdeflate compressors are not shareable, so each call owns one.
        let mut compressor = Compressor::new(level);

        let uncompressed = chunk.data();
        let mut compressed = vec![0u8; compressor.gzip_compress_bound(uncompressed.len())];
        let compressed_len = compressor
            .gzip_compress(uncompressed, &mut compressed)
            .map_err(|e| io::Error::other(format!("Gzip compression failed: {e:?}")))?;
        compressed.truncate(compressed_len);

        Ok(Chunk::new(chunk.index(), compressed))
    }
}

/// Inflates a chunk produced by [`DeflateCompress`].
///
/// The uncompressed size is taken from the gzip ISIZE trailer; libdeflate
/// verifies the CRC32 and size while inflating.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateDecompress;

impl ChunkTransform for DeflateDecompress {
    fn name(&self) -> &'static str {
        "decompress"
    }

    fn transform(&self, chunk: Chunk) -> io::Result<Chunk> {
        let compressed = chunk.data();
        if compressed.len() < GZIP_MIN_MEMBER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Gzip member too short: {} bytes", compressed.len()),
            ));
        }
        if compressed[0] != 0x1f || compressed[1] != 0x8b {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Invalid gzip magic: expected 0x1f 0x8b, got 0x{:02x} 0x{:02x}",
                    compressed[0], compressed[1]
                ),
            ));
        }

        let len = compressed.len();
        let isize = u32::from_le_bytes([
            compressed[len - 4],
            compressed[len - 3],
            compressed[len - 2],
            compressed[len - 1],
        ]) as usize;

        let limit = MAX_CHUNK_SIZE.min(len.saturating_mul(DEFLATE_MAX_RATIO));
        if isize > limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Gzip member of {len} bytes claims {isize} uncompressed bytes (limit {limit})"
                ),
            ));
        }

        let mut uncompressed = vec![0u8; isize.max(1)];
        let mut decompressor = Decompressor::new();
        let actual = decompressor.gzip_decompress(compressed, &mut uncompressed).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Gzip decompression failed: {e:?}"))
        })?;
        uncompressed.truncate(actual);

        Ok(Chunk::new(chunk.index(), uncompressed))
    }
}

/// Which direction a pipeline run transforms data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Raw bytes to compressed chunks.
    Compress,
    /// Compressed chunks back to raw bytes.
    Decompress,
}

impl Codec {
    /// Build the transform for this direction.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Config`](crate::errors::PipelineError::Config) if the
    /// compression level is out of range.
    pub fn transform(self, compression_level: u32) -> Result<Box<dyn ChunkTransform>> {
        match self {
            Self::Compress => {
                crate::validation::validate_compression_level(compression_level)?;
                Ok(Box::new(DeflateCompress::new(compression_level)))
            }
            Self::Decompress => Ok(Box::new(DeflateDecompress)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use rstest::rstest;
    use std::io::Read;

    fn round_trip(data: &[u8], level: u32) -> Vec<u8> {
        let compressed = DeflateCompress::new(level).transform(Chunk::new(5, data.to_vec())).unwrap();
        DeflateDecompress.transform(compressed).unwrap().into_data()
    }

    #[test]
    fn test_identity_passes_through() {
        let chunk = Chunk::new(3, b"payload".to_vec());
        assert_eq!(Identity.transform(chunk.clone()).unwrap(), chunk);
        assert_eq!(Identity.name(), "identity");
    }

    #[test]
    fn test_closure_is_a_transform() {
        let upper = |chunk: Chunk| -> io::Result<Chunk> {
            Ok(Chunk::new(chunk.index(), chunk.data().to_ascii_uppercase()))
        };
        let out = upper.transform(Chunk::new(0, b"abc".to_vec())).unwrap();
        assert_eq!(out.data(), b"ABC");
        assert_eq!(upper.name(), "custom");
    }

    #[test]
    fn test_round_trip_levels() {
        let data = "level=info msg=ok ".repeat(5_000).into_bytes();
        for level in [1, 6, 12] {
            assert_eq!(round_trip(&data, level), data);
        }
    }

    #[test]
    fn test_round_trip_empty_chunk() {
        assert!(round_trip(&[], 6).is_empty());
    }

    #[test]
    fn test_compressed_chunk_is_gzip_member() {
        let data = b"Hello, chunked world!".repeat(100);
        let compressed = DeflateCompress::default().transform(Chunk::new(0, data.clone())).unwrap();
        assert!(compressed.len() < data.len());

        let mut decoder = MultiGzDecoder::new(compressed.data());
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(DeflateCompress::new(0).level(), 1);
        assert_eq!(DeflateCompress::new(99).level(), 12);
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        let err = DeflateDecompress.transform(Chunk::new(0, b"short".to_vec())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = DeflateDecompress.transform(Chunk::new(0, vec![0u8; 64])).unwrap_err();
        assert!(err.to_string().contains("Invalid gzip magic"));
    }

    #[rstest]
    #[case::above_chunk_limit(u32::MAX)]
    #[case::above_deflate_ratio(5_000_000)]
    fn test_decompress_rejects_implausible_size(#[case] claimed: u32) {
        let mut compressed = DeflateCompress::default()
            .transform(Chunk::new(0, b"tiny".to_vec()))
            .unwrap()
            .into_data();
        let len = compressed.len();
        compressed[len - 4..].copy_from_slice(&claimed.to_le_bytes());

        let err = DeflateDecompress.transform(Chunk::new(0, compressed)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains(&format!("claims {claimed} uncompressed bytes")));
    }

    #[test]
    fn test_decompress_rejects_corrupt_member() {
        let mut compressed = DeflateCompress::default()
            .transform(Chunk::new(0, b"some data to corrupt".repeat(20)))
            .unwrap()
            .into_data();
        let mid = compressed.len() / 2;
        compressed[mid] ^= 0xff;

        assert!(DeflateDecompress.transform(Chunk::new(0, compressed)).is_err());
    }

    #[test]
    fn test_codec_builds_named_transform() {
        assert_eq!(Codec::Compress.transform(6).unwrap().name(), "compress");
        assert_eq!(Codec::Decompress.transform(6).unwrap().name(), "decompress");
        assert!(Codec::Compress.transform(13).is_err());
    }
}
