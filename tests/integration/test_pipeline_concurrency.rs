//! Concurrency tests for the queue and the pipeline.
//!
//! These tests verify thread-safety, order restoration, data integrity and
//! error propagation under multi-threaded execution, including
//! property-based checks of the queue contract.

#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chunkpress_lib::bounded_queue::BoundedQueue;
use chunkpress_lib::chunk::{Chunk, ChunkSource};
use chunkpress_lib::errors::PipelineError;
use chunkpress_lib::pipeline::{PipelineConfig, run_pipeline};
use chunkpress_lib::reassembler::Reassembler;
use chunkpress_lib::sink::BufferSink;
use chunkpress_lib::transform::{ChunkTransform, DeflateCompress, DeflateDecompress, Identity};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::helpers::{random_bytes, text_like_bytes};

// ============================================================================
// Test Helpers
// ============================================================================

/// Run `transform` over `data` split into `chunk_size` chunks and return the output.
fn run_over(
    data: &[u8],
    chunk_size: usize,
    transform: &dyn ChunkTransform,
    config: &PipelineConfig,
) -> Result<Vec<u8>, PipelineError> {
    let source = ChunkSource::new(data, chunk_size)?.with_len(data.len() as u64);
    let total = source.expected_chunks().unwrap_or_default();
    let mut sink = BufferSink::new();
    run_pipeline(source, total, transform, &mut sink, &config.clone().with_chunk_size(chunk_size))?;
    Ok(sink.into_inner())
}

/// Sleeps a pseudo-random few hundred microseconds per chunk to shuffle completion order.
fn jittery(chunk: Chunk) -> io::Result<Chunk> {
    let jitter = (chunk.index().wrapping_mul(2_654_435_761) % 7) * 150;
    thread::sleep(Duration::from_micros(jitter));
    Ok(chunk)
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[test]
fn test_jittered_completion_preserves_order() {
    let data = random_bytes(64 * 1024, 7);
    for workers in [1, 2, 4, 8] {
        let config = PipelineConfig::new(workers).with_queue_capacity(3);
        let output = run_over(&data, 1000, &jittery, &config).unwrap();
        assert_eq!(output, data, "workers={workers}");
    }
}

#[test]
fn test_compress_decompress_round_trip_in_memory() {
    let data = text_like_bytes(300_000);
    let config = PipelineConfig::new(4).with_queue_capacity(4);

    let compressed_chunks = {
        let source = ChunkSource::new(data.as_slice(), 8192)
            .unwrap()
            .with_len(data.len() as u64);
        let total = source.expected_chunks().unwrap();
        let mut collected = Vec::new();
        for chunk in source {
            collected.push(DeflateCompress::new(3).transform(chunk.unwrap()).unwrap());
        }
        assert_eq!(collected.len() as u64, total);
        collected
    };

    let total = compressed_chunks.len() as u64;
    let mut sink = BufferSink::new();
    run_pipeline(compressed_chunks.into_iter().map(Ok), total, &DeflateDecompress, &mut sink, &config)
        .unwrap();
    assert_eq!(sink.into_inner(), data);
}

#[test]
fn test_failure_under_contention_reports_one_index() {
    let data = random_bytes(20_000, 11);
    let attempts = AtomicUsize::new(0);
    let flaky = |chunk: Chunk| -> io::Result<Chunk> {
        attempts.fetch_add(1, Ordering::SeqCst);
        if chunk.index() % 50 == 13 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt"));
        }
        Ok(chunk)
    };

    let config = PipelineConfig::new(6).with_queue_capacity(2);
    let err = run_over(&data, 10, &flaky, &config).unwrap_err();

    let index = err.chunk_index().expect("transform error carries an index");
    assert_eq!(index % 50, 13);
    // The run stopped early instead of transforming all 2,000 chunks.
    assert!(attempts.load(Ordering::SeqCst) < 2_000);
}

#[test]
fn test_many_small_runs_do_not_deadlock() {
    let data = random_bytes(997, 3);
    for capacity in 1..=4 {
        for workers in 1..=6 {
            let config = PipelineConfig::new(workers).with_queue_capacity(capacity);
            let output = run_over(&data, 13, &Identity, &config).unwrap();
            assert_eq!(output, data, "workers={workers} capacity={capacity}");
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod queue_properties {
    use super::*;

    proptest! {
        #[test]
        fn proptest_fifo_single_thread(items in prop::collection::vec(any::<u32>(), 0..200)) {
            let queue = BoundedQueue::new(items.len().max(1)).unwrap();
            for &item in &items {
                queue.put(item).unwrap();
            }
            prop_assert_eq!(queue.len(), items.len());

            let taken: Vec<u32> = (0..items.len()).map(|_| queue.take().unwrap()).collect();
            prop_assert_eq!(taken, items);
            prop_assert!(queue.is_empty());
        }

        #[test]
        fn proptest_no_loss_or_duplication(
            producers in 1usize..5,
            consumers in 1usize..5,
            per_producer in 0usize..300,
            capacity in 1usize..8,
        ) {
            let queue = BoundedQueue::new(capacity).unwrap();
            let remaining = AtomicUsize::new(producers);
            let mut seen: HashMap<usize, usize> = HashMap::new();

            thread::scope(|s| {
                for p in 0..producers {
                    let queue = &queue;
                    let remaining = &remaining;
                    s.spawn(move || {
                        for i in 0..per_producer {
                            queue.put(p * per_producer + i).unwrap();
                        }
                        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                            queue.close();
                        }
                    });
                }

                let handles: Vec<_> = (0..consumers)
                    .map(|_| {
                        s.spawn(|| {
                            let mut taken = Vec::new();
                            while let Some(item) = queue.take() {
                                taken.push(item);
                            }
                            taken
                        })
                    })
                    .collect();

                for handle in handles {
                    for item in handle.join().unwrap() {
                        *seen.entry(item).or_insert(0) += 1;
                    }
                }
            });

            prop_assert_eq!(seen.len(), producers * per_producer);
            prop_assert!(seen.values().all(|&n| n == 1));
        }

        #[test]
        fn proptest_reassembler_restores_any_permutation(n in 0u64..300, seed in any::<u64>()) {
            let mut order: Vec<u64> = (0..n).collect();
            order.shuffle(&mut StdRng::seed_from_u64(seed));

            let queue = BoundedQueue::new(order.len().max(1)).unwrap();
            for &i in &order {
                queue.put(Chunk::new(i, i.to_le_bytes().to_vec())).unwrap();
            }
            queue.close();

            let ordered = Reassembler::new(n).collect(&queue).unwrap();
            prop_assert_eq!(ordered.len() as u64, n);
            for (i, chunk) in ordered.iter().enumerate() {
                let expected = (i as u64).to_le_bytes();
                prop_assert_eq!(chunk.index(), i as u64);
                prop_assert_eq!(chunk.data(), expected.as_slice());
            }
        }
    }
}

mod pipeline_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn proptest_identity_pipeline_reproduces_input(
            len in 0usize..5_000,
            chunk_size in 1usize..600,
            workers in 1usize..6,
            capacity in 1usize..6,
            seed in any::<u64>(),
        ) {
            let data = random_bytes(len, seed);
            let config = PipelineConfig::new(workers).with_queue_capacity(capacity);
            let output = run_over(&data, chunk_size, &Identity, &config).unwrap();
            prop_assert_eq!(output, data);
        }
    }
}
