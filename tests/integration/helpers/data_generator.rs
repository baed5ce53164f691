//! Test input generation and CLI invocation helpers.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Incompressible bytes from a seeded RNG.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Highly compressible log-like text of exactly `len` bytes.
pub fn text_like_bytes(len: usize) -> Vec<u8> {
    let record = b"2024-05-01T12:00:00Z INFO request served status=200 bytes=5120\n";
    record.iter().copied().cycle().take(len).collect()
}

/// Write `data` to `path`, panicking on failure.
pub fn write_input(path: &Path, data: &[u8]) {
    fs::write(path, data).expect("Failed to write test input");
}

/// Run the chunkpress binary with `args`, capturing its output.
pub fn run_chunkpress(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chunkpress"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("Failed to run chunkpress")
}

/// Path as `&str`, panicking on non-UTF-8 paths.
pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("Test paths are UTF-8")
}
