//! # Batch configuration.
//!
//! ## Sentinel values
//! - `batch_size = 0` → no size-triggered flush
//! - `batch_timeout = 0s` → no time-triggered flush
//! - both zero → every drain flushes whatever it accumulated
//! - `max_messages_per_cycle = 0` → drain everything queued
//! - `max_in_flight = 0` → unbounded concurrency (async variant)

use std::time::Duration;

/// How requests are grouped into batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Flush once this many requests accumulated.
    pub batch_size: usize,
    /// Flush once this long passed since the first request of the batch.
    pub batch_timeout: Duration,
    /// Messages taken from the mailbox per cycle.
    pub max_messages_per_cycle: usize,
    /// Requests processed concurrently by the async variant.
    pub max_in_flight: usize,
}

impl BatchConfig {
    /// Size-triggered batching only.
    pub fn sized(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Time-triggered batching only.
    pub fn timed(batch_timeout: Duration) -> Self {
        Self {
            batch_size: 0,
            batch_timeout,
            ..Self::default()
        }
    }

    /// `Some(n)` if size-triggered flush is enabled.
    #[inline]
    pub fn size_limit(&self) -> Option<usize> {
        (self.batch_size > 0).then_some(self.batch_size)
    }

    /// `Some(d)` if time-triggered flush is enabled.
    #[inline]
    pub fn timeout_limit(&self) -> Option<Duration> {
        (!self.batch_timeout.is_zero()).then_some(self.batch_timeout)
    }

    /// `Some(n)` if a cycle drains at most `n` messages.
    #[inline]
    pub fn drain_limit(&self) -> Option<usize> {
        (self.max_messages_per_cycle > 0).then_some(self.max_messages_per_cycle)
    }

    /// `Some(n)` if async request processing is bounded.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_in_flight > 0).then_some(self.max_in_flight)
    }

    /// Neither trigger is enabled: flush per drain.
    #[inline]
    pub fn flushes_per_drain(&self) -> bool {
        self.size_limit().is_none() && self.timeout_limit().is_none()
    }
}

impl Default for BatchConfig {
    /// - `batch_size = 1` (every request is its own batch)
    /// - `batch_timeout = 0s`
    /// - `max_messages_per_cycle = 0`
    /// - `max_in_flight = 0`
    fn default() -> Self {
        Self {
            batch_size: 1,
            batch_timeout: Duration::ZERO,
            max_messages_per_cycle: 0,
            max_in_flight: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let cfg = BatchConfig {
            batch_size: 0,
            batch_timeout: Duration::ZERO,
            max_messages_per_cycle: 0,
            max_in_flight: 0,
        };
        assert_eq!(cfg.size_limit(), None);
        assert_eq!(cfg.timeout_limit(), None);
        assert_eq!(cfg.drain_limit(), None);
        assert_eq!(cfg.concurrency_limit(), None);
        assert!(cfg.flushes_per_drain());
    }

    #[test]
    fn constructors_enable_one_trigger() {
        assert_eq!(BatchConfig::sized(5).size_limit(), Some(5));
        let timed = BatchConfig::timed(Duration::from_millis(200));
        assert_eq!(timed.size_limit(), None);
        assert_eq!(timed.timeout_limit(), Some(Duration::from_millis(200)));
        assert!(!timed.flushes_per_drain());
    }
}
