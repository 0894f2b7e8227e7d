//! # Atomic cycle counter.
//!
//! [`CycleCounter`] is a thin wrapper around [`AtomicU64`] used to count completed
//! work cycles. Clones share the same underlying counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe monotonic counter.
///
/// ## Example
/// ```rust
/// use workvisor::CycleCounter;
///
/// let counter = CycleCounter::new();
/// let shared = counter.clone();
/// shared.increment();
/// assert_eq!(counter.get(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CycleCounter {
    inner: Arc<AtomicU64>,
}

impl CycleCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter and returns the new value.
    #[inline]
    pub fn increment(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Adds `n` and returns the new value.
    #[inline]
    pub fn add(&self, n: u64) -> u64 {
        self.inner.fetch_add(n, Ordering::AcqRel) + n
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }

    /// Resets to zero and returns the previous value.
    pub fn reset(&self) -> u64 {
        self.inner.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = CycleCounter::new();
        let b = a.clone();
        a.increment();
        b.add(4);
        assert_eq!(a.get(), 5);
        assert_eq!(b.reset(), 5);
        assert_eq!(a.get(), 0);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = CycleCounter::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                let c = counter.clone();
                s.spawn(move || {
                    for _ in 0..1_000 {
                        c.increment();
                    }
                });
            }
        });
        assert_eq!(counter.get(), 8_000);
    }
}
