//! Restores sequence order to completed chunks.
//!
//! Workers finish chunks in whatever order the scheduler dictates. The
//! [`Reassembler`] drains the output queue into a slot array sized to the
//! expected chunk count, placing each chunk at its sequence index, and yields
//! the chunks in index order once the queue is closed.
//!
//! Every index in `[0, total)` must arrive exactly once. Duplicates,
//! out-of-range indices and gaps are reported as
//! [`PipelineError::Reassembly`]. The queue is always drained to the end,
//! even after a problem is found, so no producer is left blocked on it. If
//! the slot array cannot be allocated the queue is closed instead.
//!
//! # Example
//!
//! ```
//! use chunkpress_lib::bounded_queue::BoundedQueue;
//! use chunkpress_lib::chunk::Chunk;
//! use chunkpress_lib::reassembler::Reassembler;
//!
//! let queue = BoundedQueue::new(3).unwrap();
//! queue.put(Chunk::new(2, b"c".to_vec())).unwrap();
//! queue.put(Chunk::new(0, b"a".to_vec())).unwrap();
//! queue.put(Chunk::new(1, b"b".to_vec())).unwrap();
//! queue.close();
//!
//! let ordered = Reassembler::new(3).collect(&queue).unwrap();
//! let indices: Vec<u64> = ordered.iter().map(Chunk::index).collect();
//! assert_eq!(indices, vec![0, 1, 2]);
//! ```

use std::io;

use log::debug;

use crate::bounded_queue::BoundedQueue;
use crate::chunk::Chunk;
use crate::errors::{PipelineError, Result};
use crate::progress::ProgressTracker;

/// Default number of chunks between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Collects an unordered stream of chunks back into sequence order.
#[derive(Debug, Clone)]
pub struct Reassembler {
    total: u64,
    progress_interval: u64,
}

impl Reassembler {
    /// A reassembler expecting exactly `total` chunks.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self { total, progress_interval: DEFAULT_PROGRESS_INTERVAL }
    }

    /// Log progress every `interval` chunks collected.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// The number of chunks expected.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Drain `queue` until it is closed and return the chunks in index order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Allocation`] if the slot array cannot be
    /// reserved, or [`PipelineError::Reassembly`] describing the first
    /// duplicate or out-of-range index, or the gaps left once the queue closed.
    pub fn collect(&self, queue: &BoundedQueue<Chunk>) -> Result<Vec<Chunk>> {
        let mut slots = self.allocate_slots().inspect_err(|_| {
            queue.close();
        })?;
        let progress = ProgressTracker::new("Collected chunks")
            .with_interval(self.progress_interval)
            .with_total(self.total);

        let mut problem: Option<String> = None;
        while let Some(chunk) = queue.take() {
            let index = chunk.index();
            match usize::try_from(index).ok().and_then(|i| slots.get_mut(i)) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(chunk);
                    progress.log_if_needed(1);
                }
                Some(_) => {
                    problem.get_or_insert_with(|| format!("duplicate chunk index {index}"));
                }
                None => {
                    problem.get_or_insert_with(|| {
                        format!("chunk index {index} out of range (expected {} chunks)", self.total)
                    });
                }
            }
        }
        progress.log_final();

        if let Some(reason) = problem {
            return Err(PipelineError::Reassembly { reason });
        }

        let missing = slots.iter().filter(|slot| slot.is_none()).count();
        if let Some(first) = slots.iter().position(Option::is_none) {
            return Err(PipelineError::Reassembly {
                reason: format!(
                    "{missing} of {} chunks missing, first missing index {first}",
                    self.total
                ),
            });
        }

        debug!("Reassembled {} chunks", slots.len());
        Ok(slots.into_iter().flatten().collect())
    }

    fn allocate_slots(&self) -> Result<Vec<Option<Chunk>>> {
        let allocation_error = |reason: String| PipelineError::Allocation {
            what: format!("reassembly slots for {} chunks", self.total),
            source: io::Error::new(io::ErrorKind::OutOfMemory, reason),
        };

        let total = usize::try_from(self.total).map_err(|e| allocation_error(e.to_string()))?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(total).map_err(|e| allocation_error(e.to_string()))?;
        slots.resize_with(total, || None);
        Ok(slots)
    }
}
