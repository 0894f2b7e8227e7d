//! # Caller-side handle of a worker.
//!
//! [`WorkerHandle`] owns the behaviour object and the shared lifecycle state.
//! Clones refer to the same worker.
//!
//! ## Lifecycle API
//! ```text
//! run(wait)               None|Halted|ExceptionThrown|AbortedOnCleanup → Running
//! terminate(false)        None → Halted, Running → Halting
//! terminate(true)         None|Running|Halting → Aborted (AbortedOnCleanup during clean_up)
//! wait_termination(t)     Ok once terminal; Timeout after t; InvalidState if never asked to stop
//! dispose()               terminate(true), idempotent
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::core::config::WorkerConfig;
use crate::core::control::Control;
use crate::core::runner::{self, SharedWorker};
use crate::core::status::RunningStatus;
use crate::core::worker::{Worker, WorkerContext};
use crate::error::{RuntimeError, WorkerError};
use crate::primitives::CycleCounter;

/// Handle to a supervised worker.
#[derive(Clone)]
pub struct WorkerHandle {
    control: Arc<Control>,
    behaviour: SharedWorker,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

impl WorkerHandle {
    /// Creates a worker in status `None`. The name is normalised to upper case.
    pub fn new<W: Worker>(name: impl AsRef<str>, worker: W, cfg: WorkerConfig) -> Self {
        let name: Arc<str> = normalize_name(name.as_ref()).into();
        let behaviour: Box<dyn Worker> = Box::new(worker);
        Self {
            control: Arc::new(Control::new(name, cfg)),
            behaviour: Arc::new(Mutex::new(behaviour)),
        }
    }

    /// Normalised worker name.
    pub fn name(&self) -> &str {
        &self.control.name
    }

    /// Current status.
    pub fn status(&self) -> RunningStatus {
        self.control.status()
    }

    /// Most recent failure of the current run, if any.
    pub fn last_error(&self) -> Option<WorkerError> {
        self.control.last_error()
    }

    /// Cycle counter shared with the execution unit.
    pub fn cycles(&self) -> CycleCounter {
        self.control.cycles.clone()
    }

    /// Configuration this worker was built with.
    pub fn config(&self) -> &WorkerConfig {
        &self.control.cfg
    }

    /// Starts a new execution unit.
    ///
    /// No-op while `Running` or `Halting`. With a non-zero `wait`, returns once
    /// `initialize` has completed (or the run ended), or after `wait` elapsed.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidState`] when the worker was aborted.
    pub async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        let mut ready = self.control.watch_ready();
        let behaviour = self.behaviour.clone();
        let control = self.control.clone();

        let launched = self.control.launch(move |tokens| {
            let ctx = WorkerContext::new(control, tokens);
            tokio::spawn(runner::drive(behaviour, ctx))
        });
        let generation = match launched {
            Ok(generation) => generation,
            Err(status) if status.is_active() => return Ok(()),
            Err(status) => {
                return Err(RuntimeError::InvalidState {
                    worker: self.name().to_string(),
                    operation: "run",
                    status,
                });
            }
        };

        if !wait.is_zero() {
            let _ = tokio::time::timeout(wait, ready.wait_for(|r| *r >= generation)).await;
        }
        Ok(())
    }

    /// Requests a graceful (`force = false`) or forced (`force = true`) stop.
    ///
    /// Never blocks; pair with [`wait_termination`](Self::wait_termination).
    pub fn terminate(&self, force: bool) {
        if force {
            self.control.request_abort(None);
        } else {
            self.control.request_halt();
        }
    }

    /// Waits until the worker reaches a terminal status.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidState`] while `None` or `Running` (nobody asked it to stop)
    /// - [`RuntimeError::Timeout`] when `timeout` elapses first
    pub async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        let mut rx = self.control.watch_status();
        let current = *rx.borrow_and_update();
        if current.is_terminal() {
            return Ok(());
        }
        if current != RunningStatus::Halting {
            return Err(RuntimeError::InvalidState {
                worker: self.name().to_string(),
                operation: "wait for termination of",
                status: current,
            });
        }
        match tokio::time::timeout(timeout, rx.wait_for(|s| s.is_terminal())).await {
            Ok(_) => Ok(()),
            Err(_elapsed) => Err(RuntimeError::Timeout {
                worker: self.name().to_string(),
                timeout,
            }),
        }
    }

    /// Forcibly terminates an active worker. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.control.request_abort(Some("disposed"));
    }

    /// Resolves once the worker is terminal, whatever led there.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.control.watch_status();
        let _ = rx.wait_for(|s| s.is_terminal()).await;
    }
}

/// Upper-cases a worker name; names are compared case-insensitively.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}
