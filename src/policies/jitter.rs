//! # Jitter for restart pauses.
//!
//! When a supervisor loses several children to the same outage, their restarts
//! would otherwise line up. [`JitterPolicy`] spreads them out.
//!
//! - [`JitterPolicy::None`] exact pause
//! - [`JitterPolicy::Full`] random in `[0, pause]`
//! - [`JitterPolicy::Equal`] `pause/2 + random[0, pause/2]`
//! - [`JitterPolicy::Decorrelated`] random in `[first, pause × 3]`, capped at `max`

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for restart pauses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the computed pause as is (default).
    #[default]
    None,
    /// Random pause in `[0, pause]`.
    Full,
    /// Random pause in `[pause/2, pause]`.
    Equal,
    /// Random pause in `[first, pause × 3]`, capped at `max`.
    ///
    /// Needs extra context, see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `pause`. `Decorrelated` returns `pause` unchanged here.
    pub fn apply(&self, pause: Duration) -> Duration {
        let ms = pause.as_millis() as u64;
        if ms == 0 {
            return pause;
        }
        let mut rng = rand::rng();
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => pause,
            JitterPolicy::Full => Duration::from_millis(rng.random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=half))
            }
        }
    }

    /// Decorrelated jitter with its bounds; other policies fall back to [`apply`](Self::apply).
    pub fn apply_decorrelated(&self, first: Duration, pause: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(pause);
        }

        let first_ms = first.as_millis() as u64;
        let upper = (pause.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(first_ms);

        if first_ms >= upper {
            return first;
        }
        Duration::from_millis(rand::rng().random_range(first_ms..=upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_jitter_bounded_by_pause() {
        let pause = Duration::from_millis(300);
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(pause) <= pause);
        }
    }

    #[test]
    fn zero_pause_stays_zero() {
        for j in [JitterPolicy::None, JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(j.apply(Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn decorrelated_falls_back_for_other_policies() {
        let pause = Duration::from_millis(70);
        assert_eq!(
            JitterPolicy::None.apply_decorrelated(Duration::from_millis(10), pause, Duration::from_secs(1)),
            pause
        );
    }
}
