//! # Runtime events emitted by workers and supervisors.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Lifecycle**: a worker's own state machine (starting, initialized, halted, failed, ...)
//! - **Control**: requests issued by callers (halt, abort) and their fallbacks (orphaned)
//! - **Messaging**: mailbox and batch diagnostics
//! - **Supervision**: children added, removed or lost, shutdown handling
//!
//! Every kind maps to a [`Level`], which logging subscribers use to pick a sink level.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind, Level};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("INGEST")
//!     .with_reason("boom")
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("INGEST"));
//! assert_eq!(ev.level(), Level::Error);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Severity of an event, as seen by logging subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle ===
    /// The execution unit was spawned and is about to run `initialize`.
    ///
    /// Sets: `worker`, `attempt` (1-based initialize count for this run).
    WorkerStarting,

    /// `initialize` completed; the cycle loop begins.
    ///
    /// Sets: `worker`, `attempt`.
    WorkerInitialized,

    /// The unit ran `clean_up` and settled into `Halted`.
    ///
    /// Sets: `worker`.
    WorkerHalted,

    /// The unit stopped without cleanup after a forced termination.
    ///
    /// Sets: `worker`, `reason` (only when the unit observed the abort).
    WorkerAborted,

    /// `initialize` or a cycle failed and the worker settled into `ExceptionThrown`.
    ///
    /// Sets: `worker`, `reason`, `attempt`.
    WorkerFailed,

    /// `clean_up` failed; the worker settled into `AbortedOnCleanup`.
    ///
    /// Sets: `worker`, `reason`.
    CleanupFailed,

    /// A handled failure will be followed by a restart.
    ///
    /// Sets: `worker`, `reason`, `attempt` (restart number), `delay_ms`.
    RestartScheduled,

    // === Control ===
    /// A graceful stop was requested.
    ///
    /// Sets: `worker`.
    HaltRequested,

    /// A forced stop was requested.
    ///
    /// Sets: `worker`.
    AbortRequested,

    /// The unit did not finish within the orphan grace after a forced stop and was detached.
    ///
    /// Sets: `worker`, `timeout_ms`.
    WorkerOrphaned,

    // === Messaging ===
    /// A payload whose kind was never registered was delivered.
    ///
    /// Sets: `worker`, `reason` (the payload kind).
    UnregisteredMessage,

    /// A batch was reported through `handle_batch_completed`.
    ///
    /// Sets: `worker`, `batch_len`.
    BatchCompleted,

    // === Supervision ===
    /// A child was registered with a supervisor.
    ///
    /// Sets: `worker` (supervisor), `reason` (child name).
    ChildAdded,

    /// A child was explicitly removed.
    ///
    /// Sets: `worker` (supervisor), `reason` (child name).
    ChildRemoved,

    /// A registered child stopped on its own; the supervisor aborts.
    ///
    /// Sets: `worker` (supervisor), `reason` (child name and status).
    ChildLost,

    /// An OS shutdown signal was observed.
    ///
    /// Sets: `worker` (supervisor).
    ShutdownRequested,

    /// Children did not stop within the supervisor's grace period.
    ///
    /// Sets: `worker` (supervisor), `reason` (stuck children), `timeout_ms`.
    GraceExceeded,
}

impl EventKind {
    /// Severity used by logging subscribers.
    pub fn level(&self) -> Level {
        match self {
            EventKind::WorkerStarting
            | EventKind::WorkerInitialized
            | EventKind::BatchCompleted
            | EventKind::UnregisteredMessage => Level::Debug,
            EventKind::WorkerHalted
            | EventKind::HaltRequested
            | EventKind::ChildAdded
            | EventKind::ChildRemoved
            | EventKind::ShutdownRequested => Level::Info,
            EventKind::AbortRequested
            | EventKind::WorkerAborted
            | EventKind::RestartScheduled
            | EventKind::WorkerOrphaned
            | EventKind::GraceExceeded => Level::Warn,
            EventKind::WorkerFailed | EventKind::CleanupFailed | EventKind::ChildLost => {
                Level::Error
            }
        }
    }

    /// Short stable label (kebab-case) for log lines.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::WorkerStarting => "starting",
            EventKind::WorkerInitialized => "initialized",
            EventKind::WorkerHalted => "halted",
            EventKind::WorkerAborted => "aborted",
            EventKind::WorkerFailed => "failed",
            EventKind::CleanupFailed => "cleanup-failed",
            EventKind::RestartScheduled => "restart-scheduled",
            EventKind::HaltRequested => "halt-requested",
            EventKind::AbortRequested => "abort-requested",
            EventKind::WorkerOrphaned => "orphaned",
            EventKind::UnregisteredMessage => "unregistered-message",
            EventKind::BatchCompleted => "batch-completed",
            EventKind::ChildAdded => "child-added",
            EventKind::ChildRemoved => "child-removed",
            EventKind::ChildLost => "child-lost",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::GraceExceeded => "grace-exceeded",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the worker (or supervisor) the event is about.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, child names, payload kinds).
    pub reason: Option<Arc<str>>,
    /// Initialize attempt or restart number.
    pub attempt: Option<u32>,
    /// Restart pause in milliseconds.
    pub delay_ms: Option<u32>,
    /// Timeout or grace in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Number of requests in a completed batch.
    pub batch_len: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            batch_len: None,
        }
    }

    /// Severity of this event.
    #[inline]
    pub fn level(&self) -> Level {
        self.kind.level()
    }

    /// Attaches the worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt/restart number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a restart pause (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a batch length.
    #[inline]
    pub fn with_batch_len(mut self, n: usize) -> Self {
        self.batch_len = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarting);
        let b = Event::new(EventKind::WorkerHalted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn compact_durations_saturate() {
        let ev = Event::new(EventKind::WorkerOrphaned).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
