//! # Concurrent FIFO queue.
//!
//! [`ConcurrentQueue`] wraps [`crossbeam::queue::SegQueue`]: an unbounded
//! multi-producer/multi-consumer queue without a global lock. Workers use it as
//! their mailbox; test helpers use it to collect results and errors.
//!
//! ## Rules
//! - `push` never blocks and never fails.
//! - Items pushed by one producer are popped in the order that producer pushed them.
//! - `len` is a snapshot and may be stale by the time it is read.

use std::fmt;
use std::sync::Arc;

use crossbeam::queue::SegQueue;

/// Shared, cloneable FIFO queue.
pub struct ConcurrentQueue<T> {
    inner: Arc<SegQueue<T>>,
}

impl<T> ConcurrentQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SegQueue::new()),
        }
    }

    /// Appends an item at the tail.
    #[inline]
    pub fn push(&self, item: T) {
        self.inner.push(item);
    }

    /// Removes the item at the head, if any.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Pops up to `limit` items (`None` = everything currently queued).
    pub fn drain(&self, limit: Option<usize>) -> Vec<T> {
        let mut out = Vec::new();
        while limit.is_none_or(|max| out.len() < max) {
            match self.inner.pop() {
                Some(item) => out.push(item),
                None => break,
            }
        }
        out
    }

    /// Number of queued items (snapshot).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is queued (snapshot).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Clone for ConcurrentQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("len", &self.len())
            .finish()
    }
}
