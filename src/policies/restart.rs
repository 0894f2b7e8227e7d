//! # Restart policy for failing workers.
//!
//! [`RestartPolicy`] decides what happens after `initialize` or a cycle fails
//! and [`Worker::handle_exception`](crate::Worker::handle_exception) accepted
//! the error:
//!
//! ```text
//! error ──► handle_exception(err)
//!              ├─ false                      ─► ExceptionThrown
//!              └─ true ─┬─ Never             ─► ExceptionThrown
//!                       └─ OnFailure         ─► pause(backoff) ─► initialize() ─► Running
//! ```
//!
//! Cleanup failures never restart; they always end in `AbortedOnCleanup`.

/// Policy controlling whether a worker restarts after a handled failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// The first failure is terminal.
    Never,
    /// Re-run `initialize` after failures that `handle_exception` accepted (default).
    #[default]
    OnFailure,
}

impl RestartPolicy {
    /// Shorthand: `true` → [`RestartPolicy::OnFailure`], `false` → [`RestartPolicy::Never`].
    pub fn from_flag(restart_on_error: bool) -> Self {
        if restart_on_error {
            RestartPolicy::OnFailure
        } else {
            RestartPolicy::Never
        }
    }

    /// True when a handled failure should restart the worker.
    #[inline]
    pub fn restarts(&self) -> bool {
        matches!(self, RestartPolicy::OnFailure)
    }
}
