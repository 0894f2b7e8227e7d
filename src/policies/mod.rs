//! Restart policies for failed workers.
//!
//! ## Contents
//! - [`RestartPolicy`] whether a failed worker re-runs `initialize` (never / on-failure)
//! - [`BackoffPolicy`] how long to pause before each restart (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied to the pause
//!
//! ## Quick wiring
//! ```text
//! WorkerConfig { restart: RestartPolicy, backoff: BackoffPolicy, .. }
//!      └─► core::runner uses:
//!           - restart + handle_exception() to decide restart vs. ExceptionThrown
//!           - backoff.next(restarts) to pause before re-initializing
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::OnFailure`.
//! - `BackoffPolicy::default()` → first=10ms, factor=2.0, max=5s, jitter=None.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
