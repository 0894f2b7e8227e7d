//! # Worker and supervisor configuration.
//!
//! Plain structs with defaults, supplied programmatically by the embedding
//! application.
//!
//! ## Sentinel values
//! - `orphan_grace = 0s` → detach immediately after a forced stop
//! - `grace = 0s` → children that are not already stopped are forced at once

use std::time::Duration;

use crate::events::Bus;
use crate::policies::{BackoffPolicy, RestartPolicy};

/// Per-worker configuration.
///
/// ## Field semantics
/// - `restart`: whether handled failures re-run `initialize`
/// - `backoff`: pause before each restart
/// - `idle_wait`: longest a message worker's cycle waits for traffic before looping
/// - `orphan_grace`: how long a forced stop waits for the unit before detaching from it
/// - `bus`: where lifecycle events go (silent by default)
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Restart behaviour after handled failures.
    pub restart: RestartPolicy,
    /// Pause between consecutive restarts.
    pub backoff: BackoffPolicy,
    /// Upper bound on a message worker's idle wait per cycle.
    pub idle_wait: Duration,
    /// Time granted to an aborted unit before it is detached.
    pub orphan_grace: Duration,
    /// Event bus used as the logging sink.
    pub bus: Bus,
}

impl WorkerConfig {
    /// Returns a copy with the given restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a copy with the given backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a copy publishing to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    /// Idle wait clamped to at least one millisecond.
    #[inline]
    pub fn idle_wait_clamped(&self) -> Duration {
        self.idle_wait.max(Duration::from_millis(1))
    }
}

impl Default for WorkerConfig {
    /// - `restart = OnFailure`
    /// - `backoff = BackoffPolicy::default()`
    /// - `idle_wait = 50ms`
    /// - `orphan_grace = 1s`
    /// - `bus = Bus::silent()`
    fn default() -> Self {
        Self {
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            idle_wait: Duration::from_millis(50),
            orphan_grace: Duration::from_secs(1),
            bus: Bus::silent(),
        }
    }
}

/// Supervisor configuration.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Pause between two inspections of the children.
    pub poll_interval: Duration,
    /// Time children get to stop gracefully before they are forced.
    pub grace: Duration,
    /// Configuration of the supervisor's own unit.
    pub worker: WorkerConfig,
}

impl SupervisorConfig {
    /// Returns a copy whose own unit publishes to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.worker.bus = bus;
        self
    }

    /// Poll interval clamped to at least one millisecond.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }
}

impl Default for SupervisorConfig {
    /// - `poll_interval = 10ms`
    /// - `grace = 5s`
    /// - `worker.restart = Never` (a failing supervisor does not restart itself)
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            grace: Duration::from_secs(5),
            worker: WorkerConfig::default().with_restart(RestartPolicy::Never),
        }
    }
}
