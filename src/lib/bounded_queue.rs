//! Fixed-capacity blocking FIFO queue.
//!
//! [`BoundedQueue`] is a circular buffer guarded by a single mutex with two
//! condition variables (monitor pattern). Producers block in [`put`] while the
//! queue is full and consumers block in [`take`] while it is empty; a full or
//! empty queue is a normal waiting state, never an error.
//!
//! # Wake-up policy
//!
//! Every successful `put` wakes at most one waiting taker and every successful
//! `take` wakes at most one waiting putter. Waiters re-check their predicate
//! in a loop. The only broadcast is [`close`], which releases every waiter.
//!
//! # Termination
//!
//! Closing the queue is the end-of-stream message: once closed, `put` hands
//! the item back as [`Closed`], and `take` drains the remaining items in FIFO
//! order before returning `None`.
//!
//! ```
//! use chunkpress_lib::bounded_queue::BoundedQueue;
//!
//! let queue = BoundedQueue::new(2).unwrap();
//! queue.put(1).unwrap();
//! queue.put(2).unwrap();
//! queue.close();
//!
//! assert!(queue.put(3).is_err());
//! assert_eq!(queue.take(), Some(1));
//! assert_eq!(queue.take(), Some(2));
//! assert_eq!(queue.take(), None);
//! ```
//!
//! [`put`]: BoundedQueue::put
//! [`take`]: BoundedQueue::take
//! [`close`]: BoundedQueue::close

use std::fmt;
use std::io;

use parking_lot::{Condvar, Mutex};

use crate::errors::{PipelineError, Result};

/// An item returned by [`BoundedQueue::put`] because the queue was closed.
///
/// The item is handed back so ownership is never silently dropped.
#[derive(PartialEq, Eq)]
pub struct Closed<T>(pub T);

impl<T> Closed<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is closed")
    }
}

impl<T> std::error::Error for Closed<T> {}

/// State guarded by the queue mutex.
struct QueueState<T> {
    /// Circular storage; occupied slots are `head..head + count` (mod capacity).
    slots: Box<[Option<T>]>,
    /// Offset of the oldest occupied slot.
    head: usize,
    /// Number of occupied slots, `0 <= count <= capacity`.
    count: usize,
    /// Set once by `close`; never cleared.
    closed: bool,
}

/// A thread-safe, fixed-capacity, blocking FIFO queue.
///
/// Share it between threads by reference (for example from
/// [`std::thread::scope`]) or behind an `Arc`. Dropping the queue releases
/// its storage; the borrow checker guarantees no thread is still waiting
/// on it at that point.
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    /// Signalled after every `put`, broadcast on close.
    not_empty: Condvar,
    /// Signalled after every `take`, broadcast on close.
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Config`] if `capacity` is zero, or a
    /// [`PipelineError::Allocation`] if the backing storage cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::config("capacity", "queue capacity must be >= 1"));
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| PipelineError::Allocation {
            what: format!("queue of {capacity} slots"),
            source: io::Error::new(io::ErrorKind::OutOfMemory, e.to_string()),
        })?;
        slots.resize_with(capacity, || None);

        Ok(Self {
            state: Mutex::new(QueueState {
                slots: slots.into_boxed_slice(),
                head: 0,
                count: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    /// Insert an item at the tail, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the item wrapped in [`Closed`] if the queue is closed, either
    /// before the call or while this thread was waiting for space.
    pub fn put(&self, item: T) -> std::result::Result<(), Closed<T>> {
        let mut state = self.state.lock();
        while state.count == self.capacity && !state.closed {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(Closed(item));
        }

        let tail = (state.head + state.count) % self.capacity;
        debug_assert!(state.slots[tail].is_none(), "tail slot {tail} already occupied");
        state.slots[tail] = Some(item);
        state.count += 1;
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the item at the head, blocking while the queue is empty.
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.count == 0 && !state.closed {
            self.not_empty.wait(&mut state);
        }
        if state.count == 0 {
            return None;
        }

        let head = state.head;
        let item = state.slots[head].take();
        debug_assert!(item.is_some(), "head slot {head} empty with count {}", state.count);
        state.head = (head + 1) % self.capacity;
        state.count -= 1;
        drop(state);

        self.not_full.notify_one();
        item
    }

    /// Close the queue and wake every waiting thread.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was
    /// already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();
        true
    }

    /// Instantaneous number of queued items.
    ///
    /// Advisory only: the value may be stale by the time it is used.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    /// Instantaneous emptiness check. Advisory only, like [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The fixed capacity set at creation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("count", &state.count)
            .field("head", &state.head)
            .field("closed", &state.closed)
            .finish()
    }
}
