//! Error types used by the workvisor runtime and by worker hooks.
//!
//! This module defines two main error enums:
//!
//! - [`WorkerError`]: failures raised inside a worker's execution unit
//!   (hooks, panics, forced termination). Recorded as the worker's `last_error`
//!   and offered to [`Worker::handle_exception`](crate::Worker::handle_exception).
//! - [`RuntimeError`]: errors returned synchronously to callers of the
//!   lifecycle API (`wait_termination`, `run`, supervisor registry operations).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::core::RunningStatus;

/// # Errors produced inside a worker's execution unit.
///
/// Hooks return [`WorkerError::Fail`]; the engine re-classifies it by the phase
/// in which it happened before recording it, so `last_error` always tells
/// *where* the worker failed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Raw failure returned by a hook.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// `initialize` failed (or panicked).
    #[error("initialization failed: {error}")]
    Initialization {
        /// The underlying error message.
        error: String,
    },

    /// `run_single_cycle` failed (or panicked).
    #[error("cycle execution failed: {error}")]
    CycleExecution {
        /// The underlying error message.
        error: String,
    },

    /// `clean_up` failed (or panicked).
    #[error("cleanup failed: {error}")]
    Cleanup {
        /// The underlying error message.
        error: String,
    },

    /// The unit observed a forced termination while running a hook.
    #[error("worker was being aborted")]
    ForcedTermination,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::WorkerError;
    ///
    /// let err = WorkerError::CycleExecution { error: "boom".into() };
    /// assert_eq!(err.as_label(), "worker_cycle_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Initialization { .. } => "worker_initialization_failed",
            WorkerError::CycleExecution { .. } => "worker_cycle_failed",
            WorkerError::Cleanup { .. } => "worker_cleanup_failed",
            WorkerError::ForcedTermination => "worker_forced_termination",
        }
    }

    /// Returns the underlying message without the phase prefix.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error }
            | WorkerError::Initialization { error }
            | WorkerError::CycleExecution { error }
            | WorkerError::Cleanup { error } => error.clone(),
            WorkerError::ForcedTermination => "worker was being aborted".to_string(),
        }
    }

    /// True for [`WorkerError::ForcedTermination`].
    pub fn is_forced(&self) -> bool {
        matches!(self, WorkerError::ForcedTermination)
    }
}

/// # Errors returned to callers of the lifecycle API.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `wait_termination` deadline elapsed before a terminal status was reached.
    #[error("worker {worker:?} did not terminate within {timeout:?}")]
    Timeout {
        /// Worker name.
        worker: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The operation is not permitted in the worker's current status.
    #[error("cannot {operation} worker {worker:?} while {status:?}")]
    InvalidState {
        /// Worker name.
        worker: String,
        /// The attempted operation.
        operation: &'static str,
        /// Status observed when the operation was attempted.
        status: RunningStatus,
    },

    /// A child with the same name is already registered.
    #[error("worker {name:?} is already registered")]
    DuplicateWorker {
        /// Normalised worker name.
        name: String,
    },

    /// No child with this name is registered.
    #[error("worker {name:?} is not registered")]
    UnknownWorker {
        /// Normalised worker name.
        name: String,
    },

    /// Children did not stop within the supervisor's grace period.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of children that had to be force-terminated.
        stuck: Vec<String>,
    },

    /// Registering OS signal listeners failed.
    #[error("signal handling failed: {error}")]
    Signal {
        /// The underlying I/O error message.
        error: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::Timeout { worker: "W".into(), timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "runtime_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Timeout { .. } => "runtime_timeout",
            RuntimeError::InvalidState { .. } => "runtime_invalid_state",
            RuntimeError::DuplicateWorker { .. } => "runtime_duplicate_worker",
            RuntimeError::UnknownWorker { .. } => "runtime_unknown_worker",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Timeout { worker, timeout } => {
                format!("timeout after {timeout:?} waiting for {worker}")
            }
            RuntimeError::InvalidState {
                worker,
                operation,
                status,
            } => format!("invalid state: {operation} on {worker} ({status:?})"),
            RuntimeError::DuplicateWorker { name } => format!("duplicate worker: {name}"),
            RuntimeError::UnknownWorker { name } => format!("unknown worker: {name}"),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Signal { error } => format!("signal: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_strips_phase_prefix() {
        let err = WorkerError::Initialization {
            error: "TEST".into(),
        };
        assert_eq!(err.as_message(), "TEST");
        assert_eq!(err.to_string(), "initialization failed: TEST");
        assert!(!err.is_forced());
        assert!(WorkerError::ForcedTermination.is_forced());
    }

    #[test]
    fn invalid_state_mentions_operation() {
        let err = RuntimeError::InvalidState {
            worker: "W".into(),
            operation: "wait for",
            status: RunningStatus::Running,
        };
        assert_eq!(err.as_label(), "runtime_invalid_state");
        assert!(err.to_string().contains("wait for"));
    }
}
