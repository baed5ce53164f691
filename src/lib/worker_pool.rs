//! Fixed-size pool of transform workers.
//!
//! Each worker repeatedly takes a chunk from the input queue, applies the
//! shared [`ChunkTransform`], restores the chunk's sequence index on the
//! result and puts it on the output queue. A worker exits when the input
//! queue is closed and drained.
//!
//! ## Failure handling
//!
//! The first transform failure wins: it is recorded in the pool's
//! [`AbortSignal`], the abort flag is raised and the input queue is closed
//! so a loader blocked on a full queue is released. Chunks still queued are
//! drained and discarded without being transformed. A worker that panics
//! does the same from a drop guard and is reported by [`WorkerPool::join`]
//! as [`PipelineError::WorkerPanicked`].
//!
//! Workers are scoped threads, so the queues and transform are borrowed
//! rather than reference counted and cannot be dropped while a worker runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::bounded_queue::BoundedQueue;
use crate::chunk::Chunk;
use crate::errors::{PipelineError, Result};
use crate::logging::{format_count, format_percent};
use crate::transform::ChunkTransform;

/// Abort flag and first-error slot shared by the workers of one run.
#[derive(Debug, Default)]
pub struct AbortSignal {
    aborted: AtomicBool,
    first_error: Mutex<Option<PipelineError>>,
}

impl AbortSignal {
    /// A signal with the abort flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error` if no error has been recorded yet, and raise the flag.
    ///
    /// Returns `true` if this error was the first.
    pub fn fail(&self, error: PipelineError) -> bool {
        let mut slot = self.first_error.lock();
        self.aborted.store(true, Ordering::Release);
        if slot.is_none() {
            *slot = Some(error);
            true
        } else {
            false
        }
    }

    /// Raise the abort flag without recording an error.
    pub fn cancel(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Whether the run has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Remove and return the first recorded error.
    pub fn take_error(&self) -> Option<PipelineError> {
        self.first_error.lock().take()
    }
}

/// Everything a worker borrows for the lifetime of the pool.
#[derive(Clone, Copy)]
pub struct WorkerContext<'a> {
    /// Queue the workers take chunks from.
    pub input: &'a BoundedQueue<Chunk>,
    /// Queue the workers put results on.
    pub output: &'a BoundedQueue<Chunk>,
    /// Transform applied to every chunk.
    pub transform: &'a dyn ChunkTransform,
    /// Shared abort state.
    pub signal: &'a AbortSignal,
    /// Artificial delay slept before each transform.
    pub delay: Option<Duration>,
}

/// Number of chunks each worker transformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Chunks transformed, indexed by worker number.
    pub per_worker: Vec<u64>,
}

impl PoolStats {
    /// Total chunks transformed by the pool.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.per_worker.iter().sum()
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.per_worker.len()
    }
}

/// A running set of worker threads.
pub struct WorkerPool<'scope> {
    workers: Vec<ScopedJoinHandle<'scope, u64>>,
    signal: &'scope AbortSignal,
}

impl<'scope> WorkerPool<'scope> {
    /// Spawn `count` workers inside `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `count` is zero, or
    /// [`PipelineError::Allocation`] if a thread cannot be spawned. On spawn
    /// failure the input queue is closed so workers already started exit.
    pub fn start<'env>(
        scope: &'scope Scope<'scope, 'env>,
        count: usize,
        ctx: WorkerContext<'scope>,
    ) -> Result<Self> {
        crate::validation::validate_positive(count, "threads")?;

        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let spawned = thread::Builder::new()
                .name(format!("chunkpress-worker-{id}"))
                .spawn_scoped(scope, move || run_worker(id, ctx));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    ctx.signal.cancel();
                    ctx.input.close();
                    return Err(PipelineError::Allocation {
                        what: format!("worker thread {id} of {count}"),
                        source,
                    });
                }
            }
        }

        debug!("Started {count} workers using transform '{}'", ctx.transform.name());
        Ok(Self { workers, signal: ctx.signal })
    }

    /// Wait for every worker to finish, logging progress as each one joins.
    ///
    /// # Errors
    ///
    /// Returns the first transform error if any worker failed, otherwise
    /// [`PipelineError::WorkerPanicked`] for the first worker that panicked.
    pub fn join(self) -> Result<PoolStats> {
        let total = self.workers.len();
        let mut per_worker = Vec::with_capacity(total);
        let mut panicked = None;

        for (id, handle) in self.workers.into_iter().enumerate() {
            match handle.join() {
                Ok(processed) => per_worker.push(processed),
                Err(_) => {
                    warn!("Worker {id} panicked");
                    panicked.get_or_insert(id);
                    per_worker.push(0);
                }
            }
            let done = id + 1;
            info!(
                "Joined worker {done}/{total} ({})",
                format_percent(done as f64 / total as f64, 0)
            );
        }

        if let Some(error) = self.signal.take_error() {
            return Err(error);
        }
        if let Some(worker) = panicked {
            return Err(PipelineError::WorkerPanicked { worker });
        }

        let stats = PoolStats { per_worker };
        debug!("Workers transformed {} chunks: {:?}", format_count(stats.total()), stats.per_worker);
        Ok(stats)
    }

    /// Run a pool to completion over an already loaded and closed input queue.
    ///
    /// The output queue must have room for every result, since nothing drains
    /// it while the pool runs.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerPool::start`] and [`WorkerPool::join`].
    pub fn run(
        input: &BoundedQueue<Chunk>,
        output: &BoundedQueue<Chunk>,
        count: usize,
        transform: &dyn ChunkTransform,
    ) -> Result<PoolStats> {
        let signal = AbortSignal::new();
        let ctx = WorkerContext { input, output, transform, signal: &signal, delay: None };
        thread::scope(|scope| WorkerPool::start(scope, count, ctx)?.join())
    }
}

/// Raises the abort flag and closes the input queue if its worker unwinds.
struct PanicGuard<'a> {
    ctx: WorkerContext<'a>,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.ctx.signal.cancel();
            self.ctx.input.close();
        }
    }
}

fn run_worker(id: usize, ctx: WorkerContext<'_>) -> u64 {
    let _guard = PanicGuard { ctx };
    let mut processed = 0;
    let mut discarded = 0;

    while let Some(chunk) = ctx.input.take() {
        if ctx.signal.is_aborted() {
            discarded += 1;
            continue;
        }
        if let Some(delay) = ctx.delay {
            thread::sleep(delay);
        }

        let index = chunk.index();
        match ctx.transform.transform(chunk) {
            Ok(mut result) => {
                result.set_index(index);
                if ctx.output.put(result).is_err() {
                    warn!("Worker {id}: output queue closed, stopping");
                    ctx.signal.cancel();
                    ctx.input.close();
                    continue;
                }
                processed += 1;
            }
            Err(e) => {
                let error = PipelineError::Transform {
                    index,
                    transform: ctx.transform.name(),
                    reason: e.to_string(),
                };
                warn!("Worker {id}: {error}");
                ctx.signal.fail(error);
                ctx.input.close();
            }
        }
    }

    if discarded > 0 {
        debug!("Worker {id} discarded {discarded} chunks after abort");
    }
    processed
}
