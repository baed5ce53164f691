//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use std::io::Read;
use std::path::Path;
use std::process::Output;

use chunkpress_archive::ArchiveReader;
use flate2::read::MultiGzDecoder;

/// Asserts that a command exited successfully, printing stderr if not.
///
/// # Panics
///
/// Panics if the command failed.
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed with {}:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Asserts that a command failed and that stderr mentions `needle`.
///
/// # Panics
///
/// Panics if the command succeeded or stderr lacks `needle`.
pub fn assert_failure_mentions(output: &Output, needle: &str) {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(needle), "stderr does not mention '{needle}':\n{stderr}");
}

/// Decodes an archive with an independent gzip implementation.
///
/// Every record is a gzip member, so the concatenated records form one
/// multi-member gzip stream.
///
/// # Panics
///
/// Panics if the archive or any member is invalid.
pub fn gunzip_archive(path: &Path) -> (usize, Vec<u8>) {
    let mut reader = ArchiveReader::open(path).expect("Failed to open archive");
    let count = reader.count();

    let mut members = Vec::new();
    for i in 0..count {
        members.extend(reader.read_chunk(i).expect("Failed to read archive record"));
    }

    let mut decoded = Vec::new();
    MultiGzDecoder::new(members.as_slice())
        .read_to_end(&mut decoded)
        .expect("Archive records are not valid gzip members");
    (count, decoded)
}
