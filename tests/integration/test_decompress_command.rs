//! Integration tests for the decompress command, including full CLI round trips.

use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    assert_failure_mentions, assert_success, path_str, random_bytes, run_chunkpress,
    text_like_bytes, write_input,
};

const CHUNK: usize = 4096;

#[rstest]
#[case::empty(0)]
#[case::one_short_of_a_chunk(CHUNK - 1)]
#[case::exactly_one_chunk(CHUNK)]
#[case::one_past_a_chunk(CHUNK + 1)]
#[case::many_chunks(CHUNK * 9)]
fn test_round_trip_through_cli(#[case] len: usize) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("original.bin");
    let archive = dir.path().join("original.bin.ch");
    let restored = dir.path().join("restored.bin");
    let data = random_bytes(len, len as u64);
    write_input(&input, &data);

    let chunk_size = CHUNK.to_string();
    assert_success(&run_chunkpress(&[
        "compress",
        "-i",
        path_str(&input),
        "--chunk-size",
        &chunk_size,
        "-t",
        "4",
    ]));
    assert_success(&run_chunkpress(&[
        "decompress",
        "-i",
        path_str(&archive),
        "-o",
        path_str(&restored),
        "-t",
        "3",
        "--queue-size",
        "1",
    ]));

    assert_eq!(fs::read(&restored).unwrap(), data);
}

#[test]
fn test_decompress_default_output_strips_extension() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("out");
    fs::create_dir(&sub).unwrap();
    let input = dir.path().join("records.txt");
    let archive = sub.join("records.txt.ch");
    let data = text_like_bytes(20_000);
    write_input(&input, &data);

    assert_success(&run_chunkpress(&[
        "compress",
        "-i",
        path_str(&input),
        "-o",
        path_str(&archive),
        "--chunk-size",
        "1K",
    ]));
    assert_success(&run_chunkpress(&["decompress", "-i", path_str(&archive)]));

    assert_eq!(fs::read(sub.join("records.txt")).unwrap(), data);
}

#[test]
fn test_decompress_requires_output_without_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    let archive = dir.path().join("archive.bin");
    write_input(&input, b"payload");

    assert_success(&run_chunkpress(&[
        "compress",
        "-i",
        path_str(&input),
        "-o",
        path_str(&archive),
    ]));

    let output = run_chunkpress(&["decompress", "-i", path_str(&archive)]);
    assert_failure_mentions(&output, "--output");
}

#[test]
fn test_decompress_rejects_non_archive() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("plain.ch");
    let restored = dir.path().join("plain");
    write_input(&input, b"this is not an archive, just some text");

    let output = run_chunkpress(&["decompress", "-i", path_str(&input)]);
    assert_failure_mentions(&output, "Invalid archive");
    assert!(!restored.exists());
}

#[test]
fn test_decompress_with_delay_is_still_ordered() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    let archive = dir.path().join("data.bin.ch");
    let restored = dir.path().join("data.out");
    let data = text_like_bytes(10 * 512 + 17);
    write_input(&input, &data);

    assert_success(&run_chunkpress(&["compress", "-i", path_str(&input), "--chunk-size", "512"]));
    assert_success(&run_chunkpress(&[
        "decompress",
        "-i",
        path_str(&archive),
        "-o",
        path_str(&restored),
        "-t",
        "4",
        "--delay-ms",
        "5",
    ]));

    assert_eq!(fs::read(&restored).unwrap(), data);
}
