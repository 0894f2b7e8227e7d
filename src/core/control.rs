//! # Shared lifecycle state of one worker.
//!
//! [`Control`] is shared (via `Arc`) between the [`WorkerHandle`](crate::WorkerHandle)
//! the caller holds and the execution unit driving the hooks. It owns the
//! status channel and performs every status transition.
//!
//! ## Rules
//! - Transitions that touch the run's tokens happen under the `run` lock, so a
//!   halt or abort can never target a stale run.
//! - The unit only writes a terminal status while the worker is still active
//!   ([`Control::settle`]); whatever a caller wrote first wins.
//! - A forced stop sets `Aborted` (or `AbortedOnCleanup`) synchronously, before
//!   the unit has noticed anything.
//! - Every launch gets a new generation; "ready" is published per generation, so
//!   a unit still finishing an older run cannot mark a newer one ready.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::WorkerConfig;
use crate::core::status::{Phase, PhaseCell, RunningStatus};
use crate::error::WorkerError;
use crate::events::{Event, EventKind};
use crate::primitives::CycleCounter;

/// Cancellation pair of one run.
///
/// `halt` is a child of `force`: a forced stop also wakes anything waiting
/// for a graceful one.
#[derive(Clone, Debug)]
pub(crate) struct RunTokens {
    pub(crate) halt: CancellationToken,
    pub(crate) force: CancellationToken,
    pub(crate) generation: u64,
}

impl RunTokens {
    pub(crate) fn fresh(generation: u64) -> Self {
        let force = CancellationToken::new();
        let halt = force.child_token();
        Self {
            halt,
            force,
            generation,
        }
    }
}

#[derive(Default)]
struct RunSlot {
    tokens: Option<RunTokens>,
    join: Option<JoinHandle<()>>,
    generation: u64,
}

pub(crate) struct Control {
    pub(crate) name: Arc<str>,
    pub(crate) cfg: WorkerConfig,
    pub(crate) cycles: CycleCounter,
    status: watch::Sender<RunningStatus>,
    /// Latest generation that finished `initialize` (or ended).
    ready: watch::Sender<u64>,
    last_error: Mutex<Option<WorkerError>>,
    phase: PhaseCell,
    run: Mutex<RunSlot>,
}

impl Control {
    pub(crate) fn new(name: Arc<str>, cfg: WorkerConfig) -> Self {
        let (status, _) = watch::channel(RunningStatus::None);
        let (ready, _) = watch::channel(0);
        Self {
            name,
            cfg,
            cycles: CycleCounter::new(),
            status,
            ready,
            last_error: Mutex::new(None),
            phase: PhaseCell::new(),
            run: Mutex::new(RunSlot::default()),
        }
    }

    pub(crate) fn status(&self) -> RunningStatus {
        *self.status.borrow()
    }

    pub(crate) fn watch_status(&self) -> watch::Receiver<RunningStatus> {
        self.status.subscribe()
    }

    pub(crate) fn watch_ready(&self) -> watch::Receiver<u64> {
        self.ready.subscribe()
    }

    pub(crate) fn last_error(&self) -> Option<WorkerError> {
        self.last_error.lock().clone()
    }

    pub(crate) fn set_last_error(&self, err: Option<WorkerError>) {
        *self.last_error.lock() = err;
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.set(phase);
    }

    /// Marks run `generation` as past `initialize` (or finished).
    pub(crate) fn mark_ready(&self, generation: u64) {
        self.ready.send_if_modified(|r| {
            if *r < generation {
                *r = generation;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.cfg.bus.publish(ev.with_worker(self.name.clone()));
    }

    /// Moves a startable worker to `Running` and spawns its unit.
    ///
    /// `spawn` receives the fresh tokens and must return the unit's join handle.
    /// Returns the new run's generation, or the status observed when launching
    /// was refused.
    pub(crate) fn launch<F>(&self, spawn: F) -> Result<u64, RunningStatus>
    where
        F: FnOnce(RunTokens) -> JoinHandle<()>,
    {
        let mut slot = self.run.lock();
        let mut refused = None;
        self.status.send_if_modified(|s| {
            if s.can_start() {
                *s = RunningStatus::Running;
                true
            } else {
                refused = Some(*s);
                false
            }
        });
        if let Some(status) = refused {
            return Err(status);
        }

        self.set_last_error(None);
        self.set_phase(Phase::Idle);

        slot.generation += 1;
        let generation = slot.generation;
        let tokens = RunTokens::fresh(generation);
        slot.tokens = Some(tokens.clone());
        slot.join = Some(spawn(tokens));
        Ok(generation)
    }

    /// Graceful stop request. Returns `true` if the status changed.
    ///
    /// - `None` → `Halted`
    /// - `Running` → `Halting` (the run's halt token is cancelled)
    /// - anything else: no-op
    pub(crate) fn request_halt(&self) -> bool {
        let slot = self.run.lock();
        let mut next = None;
        self.status.send_if_modified(|s| match *s {
            RunningStatus::None => {
                *s = RunningStatus::Halted;
                next = Some(*s);
                true
            }
            RunningStatus::Running => {
                *s = RunningStatus::Halting;
                next = Some(*s);
                true
            }
            _ => false,
        });
        if next == Some(RunningStatus::Halting) {
            if let Some(tokens) = &slot.tokens {
                tokens.halt.cancel();
            }
            self.publish(Event::new(EventKind::HaltRequested));
        }
        next.is_some()
    }

    /// Forced stop request. Returns `true` if the status changed.
    ///
    /// - `None` → `Aborted`
    /// - `Running`/`Halting` → `Aborted`, or `AbortedOnCleanup` while `clean_up` runs;
    ///   the force token is cancelled and a watchdog detaches the unit if it does
    ///   not finish within `orphan_grace`
    /// - terminal statuses: no-op
    pub(crate) fn request_abort(&self, reason: Option<&str>) -> bool {
        let mut slot = self.run.lock();
        let mut was_active = false;
        let phase = self.phase();
        let changed = self.status.send_if_modified(|s| match *s {
            RunningStatus::None => {
                *s = RunningStatus::Aborted;
                true
            }
            RunningStatus::Running | RunningStatus::Halting => {
                was_active = true;
                *s = if phase == Phase::CleaningUp {
                    RunningStatus::AbortedOnCleanup
                } else {
                    RunningStatus::Aborted
                };
                true
            }
            _ => false,
        });
        if !changed {
            return false;
        }

        let mut ev = Event::new(EventKind::AbortRequested);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.publish(ev);

        if was_active {
            if let Some(tokens) = &slot.tokens {
                tokens.force.cancel();
            }
            if let Some(join) = slot.join.take() {
                self.watch_orphan(join);
            }
        }
        true
    }

    /// Writes a terminal status if the worker is still active.
    pub(crate) fn settle(&self, to: RunningStatus) -> bool {
        self.status.send_if_modified(|s| {
            if s.is_active() {
                *s = to;
                true
            } else {
                false
            }
        })
    }

    fn watch_orphan(&self, mut join: JoinHandle<()>) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let grace = self.cfg.orphan_grace;
        let bus = self.cfg.bus.clone();
        let name = self.name.clone();

        rt.spawn(async move {
            if tokio::time::timeout(grace, &mut join).await.is_err() {
                join.abort();
                bus.publish(
                    Event::new(EventKind::WorkerOrphaned)
                        .with_worker(name)
                        .with_timeout(grace),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_run_cannot_mark_newer_run_ready() {
        let control = Control::new("C".into(), WorkerConfig::default());
        let first = control.launch(|_| tokio::spawn(async {})).unwrap();
        control.request_halt();
        assert!(control.settle(RunningStatus::Halted));

        let second = control.launch(|_| tokio::spawn(async {})).unwrap();
        assert!(second > first);
        control.mark_ready(first);
        assert!(*control.watch_ready().borrow() < second);

        control.mark_ready(second);
        assert_eq!(*control.watch_ready().borrow(), second);
    }

    #[tokio::test]
    async fn launch_is_refused_while_active() {
        let control = Control::new("C".into(), WorkerConfig::default());
        control.launch(|_| tokio::spawn(async {})).unwrap();
        assert_eq!(
            control.launch(|_| tokio::spawn(async {})),
            Err(RunningStatus::Running)
        );
    }
}
