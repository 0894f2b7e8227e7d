//! # Pause between worker restarts.
//!
//! [`BackoffPolicy`] computes how long a failed worker waits before running
//! `initialize` again. The pause for the `n`-th consecutive restart is
//! `first × factor^n`, clamped to `max`, then jittered. The base is derived from
//! `n` alone, so jitter never feeds back into later pauses.
//!
//! The restart counter resets once a cycle completes successfully, so a worker
//! that recovers starts again from `first`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use workvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(20),
//!     max: Duration::from_millis(100),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(20));
//! assert_eq!(backoff.next(2), Duration::from_millis(80));
//! assert_eq!(backoff.next(3), Duration::from_millis(100));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart pause policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Pause before the first restart.
    pub first: Duration,
    /// Upper bound for any pause.
    pub max: Duration,
    /// Multiplicative growth per consecutive restart (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped pause.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 10ms`, `factor = 2.0`, `max = 5s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Restart immediately, every time.
    pub fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Pause before the `restart`-th consecutive restart (0-indexed).
    ///
    /// Non-finite or negative intermediate values clamp to [`BackoffPolicy::max`].
    pub fn next(&self, restart: u32) -> Duration {
        let exp = restart.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(first_ms: u64, max_ms: u64, factor: f64, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter,
        }
    }

    #[test]
    fn grows_then_clamps() {
        let p = policy(10, 1_000, 2.0, JitterPolicy::None);
        let pauses: Vec<u128> = (0..9).map(|n| p.next(n).as_millis()).collect();
        assert_eq!(pauses, vec![10, 20, 40, 80, 160, 320, 640, 1_000, 1_000]);
    }

    #[test]
    fn first_above_max_is_clamped() {
        let p = policy(5_000, 1_000, 1.0, JitterPolicy::None);
        assert_eq!(p.next(0), Duration::from_secs(1));
    }

    #[test]
    fn overflowing_exponent_clamps_to_max() {
        let p = policy(10, 2_000, 10.0, JitterPolicy::None);
        assert_eq!(p.next(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn immediate_never_waits() {
        let p = BackoffPolicy::immediate();
        assert!((0..20).all(|n| p.next(n).is_zero()));
    }

    #[test]
    fn equal_jitter_stays_within_half_and_base() {
        let p = policy(400, 10_000, 1.0, JitterPolicy::Equal);
        for n in 0..50 {
            let d = p.next(n);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(400), "{d:?}");
        }
    }

    #[test]
    fn decorrelated_jitter_never_below_first() {
        let p = policy(50, 5_000, 2.0, JitterPolicy::Decorrelated);
        for _ in 0..100 {
            let d = p.next(6);
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_secs(5), "{d:?}");
        }
    }
}
