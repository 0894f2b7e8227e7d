//! # Execution unit: drives one run of a worker's hooks.
//!
//! ## Flow
//! ```text
//! lock behaviour
//! loop {
//!   initialize ── Err ─► failure ─► restart? ── yes ─► backoff ─► (loop)
//!      │                                 │   (never after a failed restart)
//!      │                                 └── no ─► ExceptionThrown (no clean_up)
//!      ▼
//!   while !halting { run_single_cycle ── Err ─► failure (as above)
//!                                      ── Ok(false) ─► request halt }
//! }
//! clean_up ── Ok ─► Halted
//!          └─ Err ─► AbortedOnCleanup
//! ```
//!
//! ## Rules
//! - Every hook is raced against the run's force token; a forced stop drops
//!   the hook future at its next suspension point.
//! - Panics in hooks are caught and treated as errors of the current phase.
//! - A hook that itself reports [`WorkerError::ForcedTermination`] is recorded
//!   as `last_error`; a hook that is dropped leaves `last_error` untouched.
//! - The restart counter resets after each successful cycle.
//! - A restart whose `initialize` fails again ends the run in `ExceptionThrown`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::core::status::{Phase, RunningStatus};
use crate::core::worker::{Worker, WorkerContext};
use crate::error::WorkerError;
use crate::events::{Event, EventKind};

/// Behaviour object shared between a handle and its successive units.
pub(crate) type SharedWorker = Arc<Mutex<Box<dyn Worker>>>;

/// Outcome of one guarded hook invocation.
enum Step<T> {
    Done(Result<T, WorkerError>),
    Forced,
}

/// What the failure path decided.
enum Recovery {
    Restart,
    Stop,
}

/// Runs `fut` until it completes or the force token fires.
///
/// The hook is polled first, so a hook that observes the abort itself wins.
async fn step<T, F>(force: &CancellationToken, fut: F) -> Step<T>
where
    F: Future<Output = Result<T, WorkerError>>,
{
    if force.is_cancelled() {
        return Step::Forced;
    }
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    tokio::select! {
        biased;
        res = guarded => Step::Done(res.unwrap_or_else(|p| Err(WorkerError::fail(panic_message(p))))),
        _ = force.cancelled() => Step::Forced,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Re-labels a raw hook failure by the phase it happened in.
fn classify(phase: Phase, err: WorkerError) -> WorkerError {
    match err {
        WorkerError::Fail { error } => match phase {
            Phase::Initializing => WorkerError::Initialization { error },
            Phase::CleaningUp => WorkerError::Cleanup { error },
            _ => WorkerError::CycleExecution { error },
        },
        other => other,
    }
}

/// Drives one run to completion. Spawned by [`WorkerHandle::run`](crate::WorkerHandle::run).
pub(crate) async fn drive(behaviour: SharedWorker, ctx: WorkerContext) {
    let control = ctx.control().clone();
    let force = ctx.force_token().clone();

    let mut worker = tokio::select! {
        biased;
        _ = force.cancelled() => return aborted(&ctx, None),
        guard = behaviour.lock_owned() => guard,
    };

    let mut attempt: u32 = 0;
    let mut restarts: u32 = 0;
    let mut restarting = false;

    'run: loop {
        attempt += 1;
        control.set_phase(Phase::Initializing);
        control.publish(Event::new(EventKind::WorkerStarting).with_attempt(attempt));

        match step(&force, worker.initialize(&ctx)).await {
            Step::Forced => return aborted(&ctx, None),
            Step::Done(Err(err)) => {
                let failure = Failure {
                    phase: Phase::Initializing,
                    retry: !restarting,
                };
                match on_failure(&ctx, &mut worker, failure, err, &mut restarts).await {
                    Recovery::Restart => {
                        restarting = true;
                        continue 'run;
                    }
                    Recovery::Stop => return finish(&ctx),
                }
            }
            Step::Done(Ok(())) => {}
        }
        restarting = false;
        control.mark_ready(ctx.generation());
        control.publish(Event::new(EventKind::WorkerInitialized).with_attempt(attempt));
        control.set_phase(Phase::Cycling);

        while !ctx.is_halting() {
            match step(&force, worker.run_single_cycle(&ctx)).await {
                Step::Forced => return aborted(&ctx, None),
                Step::Done(Ok(keep_going)) => {
                    control.cycles.increment();
                    restarts = 0;
                    if !keep_going {
                        control.request_halt();
                    }
                }
                Step::Done(Err(err)) => {
                    let failure = Failure {
                        phase: Phase::Cycling,
                        retry: true,
                    };
                    match on_failure(&ctx, &mut worker, failure, err, &mut restarts).await {
                        Recovery::Restart => {
                            restarting = true;
                            continue 'run;
                        }
                        Recovery::Stop => return finish(&ctx),
                    }
                }
            }
        }
        break;
    }

    if force.is_cancelled() {
        return aborted(&ctx, None);
    }
    control.set_phase(Phase::CleaningUp);
    match step(&force, worker.clean_up(&ctx)).await {
        Step::Forced => aborted(&ctx, None),
        Step::Done(Ok(())) => {
            if control.settle(RunningStatus::Halted) {
                control.publish(Event::new(EventKind::WorkerHalted));
            }
            finish(&ctx);
        }
        Step::Done(Err(err)) if err.is_forced() => forced_by_hook(&ctx),
        Step::Done(Err(err)) => {
            let err = classify(Phase::CleaningUp, err);
            offer(&mut worker, &err);
            control.set_last_error(Some(err.clone()));
            control.settle(RunningStatus::AbortedOnCleanup);
            control.publish(Event::new(EventKind::CleanupFailed).with_reason(err.to_string()));
            finish(&ctx);
        }
    }
}

/// Where a failure happened and whether a restart may follow it.
///
/// An `initialize` that fails while restarting is final.
struct Failure {
    phase: Phase,
    retry: bool,
}

/// Failure path of `initialize` and `run_single_cycle`.
async fn on_failure(
    ctx: &WorkerContext,
    worker: &mut OwnedMutexGuard<Box<dyn Worker>>,
    failure: Failure,
    err: WorkerError,
    restarts: &mut u32,
) -> Recovery {
    let control = ctx.control();
    if err.is_forced() {
        forced_by_hook(ctx);
        return Recovery::Stop;
    }
    if ctx.is_aborted() {
        aborted(ctx, None);
        return Recovery::Stop;
    }

    let err = classify(failure.phase, err);
    let handled = offer(worker, &err);
    control.set_last_error(Some(err.clone()));

    let cfg = &control.cfg;
    let restart = failure.retry && handled && cfg.restart.restarts();
    if restart && control.status() == RunningStatus::Running {
        let delay = cfg.backoff.next(*restarts);
        *restarts = restarts.saturating_add(1);
        control.publish(
            Event::new(EventKind::RestartScheduled)
                .with_reason(err.to_string())
                .with_attempt(*restarts)
                .with_delay(delay),
        );
        control.set_phase(Phase::Restarting);

        tokio::select! {
            biased;
            _ = ctx.force_token().cancelled() => {
                aborted(ctx, None);
                return Recovery::Stop;
            }
            _ = ctx.halted() => {
                control.set_last_error(None);
                if control.settle(RunningStatus::Halted) {
                    control.publish(Event::new(EventKind::WorkerHalted));
                }
                return Recovery::Stop;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        control.set_last_error(None);
        return Recovery::Restart;
    }

    if control.settle(RunningStatus::ExceptionThrown) {
        control.publish(Event::new(EventKind::WorkerFailed).with_reason(err.to_string()));
    }
    Recovery::Stop
}

/// Offers `err` to the behaviour; a panicking handler counts as "not handled".
fn offer(worker: &mut OwnedMutexGuard<Box<dyn Worker>>, err: &WorkerError) -> bool {
    std::panic::catch_unwind(AssertUnwindSafe(|| worker.handle_exception(err))).unwrap_or(false)
}

/// The hook observed the abort and said so.
fn forced_by_hook(ctx: &WorkerContext) {
    let control = ctx.control();
    control.set_last_error(Some(WorkerError::ForcedTermination));
    control.request_abort(None);
    aborted(ctx, Some("hook observed forced termination"));
}

fn aborted(ctx: &WorkerContext, reason: Option<&str>) {
    let control = ctx.control();
    control.settle(RunningStatus::Aborted);
    let mut ev = Event::new(EventKind::WorkerAborted);
    if let Some(reason) = reason {
        ev = ev.with_reason(reason);
    }
    control.publish(ev);
    finish(ctx);
}

fn finish(ctx: &WorkerContext) {
    let control = ctx.control();
    control.set_phase(Phase::Idle);
    control.mark_ready(ctx.generation());
}
