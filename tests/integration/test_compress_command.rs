//! Integration tests for the compress command.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{
    assert_failure_mentions, assert_success, gunzip_archive, path_str, random_bytes,
    run_chunkpress, text_like_bytes, write_input,
};

#[test]
fn test_compress_default_output_name() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("records.txt");
    let data = text_like_bytes(100_000);
    write_input(&input, &data);

    let output = run_chunkpress(&["compress", "-i", path_str(&input), "--chunk-size", "16K"]);
    assert_success(&output);

    let archive = dir.path().join("records.txt.ch");
    assert!(archive.exists(), "expected default output {}", archive.display());

    let (count, decoded) = gunzip_archive(&archive);
    assert_eq!(count, 100_000usize.div_ceil(16 * 1024));
    assert_eq!(decoded, data);
    assert!(fs::metadata(&archive).unwrap().len() < data.len() as u64 / 2);
}

#[test]
fn test_compress_explicit_output_and_options() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blob.bin");
    let archive = dir.path().join("custom.ch");
    let data = random_bytes(50_000, 42);
    write_input(&input, &data);

    let output = run_chunkpress(&[
        "compress",
        "-i",
        path_str(&input),
        "-o",
        path_str(&archive),
        "--threads",
        "5",
        "--chunk-size",
        "3000",
        "--queue-size",
        "2",
        "--compression-level",
        "1",
    ]);
    assert_success(&output);

    let (count, decoded) = gunzip_archive(&archive);
    assert_eq!(count, 17);
    assert_eq!(decoded, data);
}

#[test]
fn test_compress_logs_worker_progress() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("small.txt");
    write_input(&input, b"a small file");

    let output = run_chunkpress(&["compress", "-i", path_str(&input), "-t", "2"]);
    assert_success(&output);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Running chunkpress version"));
    assert!(stderr.contains("Joined worker 2/2 (100%)"));
    assert!(stderr.contains("Pipeline Summary"));
}

#[test]
fn test_compress_missing_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("absent.bin");

    let output = run_chunkpress(&["compress", "-i", path_str(&input)]);
    assert_failure_mentions(&output, "does not exist");
    assert!(!dir.path().join("absent.bin.ch").exists());
}

#[test]
fn test_compress_rejects_zero_threads() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    write_input(&input, b"data");

    let output = run_chunkpress(&["compress", "-i", path_str(&input), "--threads", "0"]);
    assert_failure_mentions(&output, "threads");
    assert!(!dir.path().join("data.bin.ch").exists());
}

#[test]
fn test_compress_rejects_bad_level() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    write_input(&input, b"data");

    let output =
        run_chunkpress(&["compress", "-i", path_str(&input), "--compression-level", "13"]);
    assert_failure_mentions(&output, "compression-level");
}

#[test]
fn test_compress_rejects_malformed_chunk_size() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.bin");
    write_input(&input, b"data");

    let output = run_chunkpress(&["compress", "-i", path_str(&input), "--chunk-size", "lots"]);
    assert_failure_mentions(&output, "invalid size");
}
