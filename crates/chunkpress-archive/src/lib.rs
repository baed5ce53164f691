#![deny(unsafe_code)]

//! Indexed chunk archive container.
//!
//! This crate provides the on-disk container that holds compressed chunks:
//! - [`writer`] - Append-only chunk writing with a trailing offset index
//! - [`reader`] - Random access to chunks by index
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (8 bytes): "CPAR" + version(1) + reserved(3)      │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record 0: length(u32 LE) + payload                       │
//! │ Record 1: length(u32 LE) + payload                       │
//! │ ...                                                      │
//! ├──────────────────────────────────────────────────────────┤
//! │ Index: one record offset (u64 LE) per chunk              │
//! │ Footer (12 bytes): count(u64 LE) + "CPIX"                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The order of `append_chunk` calls determines the on-disk order, so
//! chunk `i` of the reader is the `i`-th appended payload.

pub mod reader;
pub mod writer;

pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

/// Magic bytes at the start of every archive.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"CPAR";

/// Magic bytes closing the footer.
pub const INDEX_MAGIC: [u8; 4] = *b"CPIX";

/// Current container version.
pub const ARCHIVE_VERSION: u8 = 1;

/// Size of the fixed header.
pub const HEADER_SIZE: u64 = 8;

/// Size of the fixed footer (count + magic).
pub const FOOTER_SIZE: u64 = 12;

/// Size of the per-record length prefix.
pub const RECORD_PREFIX_SIZE: u64 = 4;

/// Encode the fixed archive header.
#[must_use]
pub fn header_bytes() -> [u8; HEADER_SIZE as usize] {
    let mut header = [0u8; HEADER_SIZE as usize];
    header[..4].copy_from_slice(&ARCHIVE_MAGIC);
    header[4] = ARCHIVE_VERSION;
    header
}
