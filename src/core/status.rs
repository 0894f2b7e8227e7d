//! # Worker lifecycle status.
//!
//! ```text
//!            run()                terminate()            clean_up ok
//!   None ──────────► Running ─────────────────► Halting ────────────► Halted
//!    │                  │  │                        │
//!    │ terminate()      │  │ init/cycle error       │ clean_up error
//!    ▼                  │  ▼ (no restart)           ▼
//!   Halted              │  ExceptionThrown        AbortedOnCleanup
//!                       │
//!                       │ terminate(force)
//!                       ▼
//!                    Aborted  (AbortedOnCleanup if clean_up was running)
//! ```
//!
//! `Halted`, `ExceptionThrown` and `AbortedOnCleanup` may be re-entered into
//! `Running` by another `run()`. `Aborted` is final.

use std::sync::atomic::{AtomicU8, Ordering};

/// Observable state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunningStatus {
    /// Constructed, never started.
    #[default]
    None,
    /// The execution unit is alive.
    Running,
    /// A graceful stop was requested; the current cycle finishes, then `clean_up` runs.
    Halting,
    /// Stopped after a successful `clean_up`.
    Halted,
    /// `initialize` or a cycle failed and no restart followed.
    ExceptionThrown,
    /// `clean_up` failed, or a forced stop interrupted it.
    AbortedOnCleanup,
    /// Forcibly terminated before `clean_up` could run.
    Aborted,
}

impl RunningStatus {
    /// The unit has stopped (successfully or not).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunningStatus::Halted
                | RunningStatus::ExceptionThrown
                | RunningStatus::AbortedOnCleanup
                | RunningStatus::Aborted
        )
    }

    /// The unit is alive (`Running` or `Halting`).
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, RunningStatus::Running | RunningStatus::Halting)
    }

    /// A new run may be launched from this status.
    #[inline]
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            RunningStatus::None
                | RunningStatus::Halted
                | RunningStatus::ExceptionThrown
                | RunningStatus::AbortedOnCleanup
        )
    }

    /// Terminal and something went wrong.
    #[inline]
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != RunningStatus::Halted
    }
}

/// Which hook the execution unit is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Phase {
    Idle = 0,
    Initializing = 1,
    Cycling = 2,
    Restarting = 3,
    CleaningUp = 4,
}

/// Atomic cell holding a [`Phase`].
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Phase::Idle as u8))
    }

    pub(crate) fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> Phase {
        match self.0.load(Ordering::Acquire) {
            1 => Phase::Initializing,
            2 => Phase::Cycling,
            3 => Phase::Restarting,
            4 => Phase::CleaningUp,
            _ => Phase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_disjoint() {
        use RunningStatus::*;
        for s in [None, Running, Halting, Halted, ExceptionThrown, AbortedOnCleanup, Aborted] {
            assert!(!(s.is_terminal() && s.is_active()), "{s:?}");
        }
        assert!(Halted.can_start() && !Halted.is_failure());
        assert!(!Aborted.can_start() && Aborted.is_failure());
        assert!(!Halting.can_start());
    }

    #[test]
    fn phase_cell_roundtrip() {
        let cell = PhaseCell::new();
        assert_eq!(cell.get(), Phase::Idle);
        cell.set(Phase::CleaningUp);
        assert_eq!(cell.get(), Phase::CleaningUp);
    }
}
