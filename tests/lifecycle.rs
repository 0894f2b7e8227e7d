//! Worker lifecycle: start, graceful and forced stop, failures and restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use workvisor::{
    BackoffPolicy, Bus, EventKind, RestartPolicy, RunningStatus, RuntimeError, Worker,
    WorkerConfig, WorkerContext, WorkerError, WorkerHandle,
};

#[derive(Default, Clone)]
struct Probe {
    init: Arc<AtomicUsize>,
    cycles: Arc<AtomicUsize>,
    cleanup: Arc<AtomicUsize>,
    cleanup_started: Arc<AtomicBool>,
}

#[derive(Clone, Copy, Default)]
struct Mode {
    fail_init: bool,
    init_pause: Duration,
    fail_cycles: usize,
    handle: bool,
    observe_abort: bool,
    panic_in_cycle: bool,
    stop_after: Option<usize>,
    cycle_pause: Duration,
    cleanup_pause: Duration,
    fail_cleanup: bool,
}

struct TestWorker {
    probe: Probe,
    mode: Mode,
}

impl TestWorker {
    fn new(mode: Mode) -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                probe: probe.clone(),
                mode,
            },
            probe,
        )
    }
}

#[async_trait]
impl Worker for TestWorker {
    async fn initialize(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.probe.init.fetch_add(1, Ordering::SeqCst);
        if !self.mode.init_pause.is_zero() {
            tokio::time::sleep(self.mode.init_pause).await;
        }
        if self.mode.fail_init {
            return Err(WorkerError::fail("init boom"));
        }
        Ok(())
    }

    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        let n = self.probe.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        if self.mode.panic_in_cycle {
            panic!("cycle exploded");
        }
        if self.mode.fail_cycles > 0 {
            self.mode.fail_cycles -= 1;
            return Err(WorkerError::fail("boom"));
        }
        let pause = self.mode.cycle_pause.max(Duration::from_millis(2));
        if self.mode.observe_abort {
            ctx.sleep(pause).await?;
        } else {
            tokio::time::sleep(pause).await;
        }
        Ok(self.mode.stop_after.is_none_or(|max| n < max))
    }

    async fn clean_up(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.probe.cleanup_started.store(true, Ordering::SeqCst);
        if !self.mode.cleanup_pause.is_zero() {
            tokio::time::sleep(self.mode.cleanup_pause).await;
        }
        self.probe.cleanup.fetch_add(1, Ordering::SeqCst);
        if self.mode.fail_cleanup {
            return Err(WorkerError::fail("cleanup boom"));
        }
        Ok(())
    }

    fn handle_exception(&mut self, _error: &WorkerError) -> bool {
        self.mode.handle
    }
}

fn spawn(mode: Mode, cfg: WorkerConfig) -> (WorkerHandle, Probe) {
    let (worker, probe) = TestWorker::new(mode);
    (WorkerHandle::new("test", worker, cfg), probe)
}

async fn eventually(mut cond: impl FnMut() -> bool, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

const SECOND: Duration = Duration::from_secs(1);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn starts_in_none_without_error() {
    let (w, probe) = spawn(Mode::default(), WorkerConfig::default());
    assert_eq!(w.status(), RunningStatus::None);
    assert!(w.last_error().is_none());
    assert_eq!(probe.init.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_then_graceful_stop_halts() {
    let (w, probe) = spawn(Mode::default(), WorkerConfig::default());
    w.run(Duration::ZERO).await.unwrap();
    assert_eq!(w.status(), RunningStatus::Running);

    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();

    assert_eq!(w.status(), RunningStatus::Halted);
    assert_eq!(probe.init.load(Ordering::SeqCst), 1);
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 1);
    assert!(w.last_error().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn graceful_stop_is_idempotent() {
    let (w, _) = spawn(Mode::default(), WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    w.terminate(false);
    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();
    w.terminate(false);
    assert_eq!(w.status(), RunningStatus::Halted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forced_stop_skips_cleanup() {
    let mode = Mode {
        cycle_pause: Duration::from_millis(50),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    w.terminate(true);
    assert_eq!(w.status(), RunningStatus::Aborted);
    w.wait_termination(SECOND).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
    assert!(w.last_error().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn observed_abort_is_recorded() {
    let mode = Mode {
        observe_abort: true,
        cycle_pause: Duration::from_millis(500),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    assert!(eventually(|| probe.cycles.load(Ordering::SeqCst) > 0, SECOND).await);

    w.terminate(true);
    assert!(eventually(|| w.last_error().is_some(), SECOND).await);
    assert_eq!(w.last_error(), Some(WorkerError::ForcedTermination));
    assert_eq!(w.status(), RunningStatus::Aborted);
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forced_stop_during_cleanup() {
    let mode = Mode {
        cleanup_pause: Duration::from_millis(500),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    w.terminate(false);
    assert!(eventually(|| probe.cleanup_started.load(Ordering::SeqCst), SECOND).await);
    w.terminate(true);

    assert_eq!(w.status(), RunningStatus::AbortedOnCleanup);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn aborted_worker_cannot_run_again() {
    let (w, _) = spawn(Mode::default(), WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    w.dispose();
    w.dispose();
    assert_eq!(w.status(), RunningStatus::Aborted);
    let err = w.run(Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidState { operation: "run", .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_on_running_worker_is_invalid() {
    let (w, _) = spawn(Mode::default(), WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    let err = w.wait_termination(SECOND).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::InvalidState {
            status: RunningStatus::Running,
            ..
        }
    ));
    w.dispose();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wait_termination_times_out() {
    let mode = Mode {
        cycle_pause: Duration::from_millis(300),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    assert!(eventually(|| probe.cycles.load(Ordering::SeqCst) > 0, SECOND).await);

    w.terminate(false);
    let err = w.wait_termination(Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Timeout { .. }));

    w.wait_termination(SECOND).await.unwrap();
    assert_eq!(w.status(), RunningStatus::Halted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handled_cycle_error_restarts() {
    let mode = Mode {
        fail_cycles: 1,
        handle: true,
        ..Mode::default()
    };
    let cfg = WorkerConfig::default()
        .with_restart(RestartPolicy::OnFailure)
        .with_backoff(BackoffPolicy::immediate());
    let (w, probe) = spawn(mode, cfg);
    w.run(SECOND).await.unwrap();

    assert!(eventually(|| probe.init.load(Ordering::SeqCst) == 2, SECOND).await);
    assert!(eventually(|| probe.cycles.load(Ordering::SeqCst) > 3, SECOND).await);
    assert_eq!(w.status(), RunningStatus::Running);
    assert!(w.last_error().is_none());

    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();
    assert_eq!(w.status(), RunningStatus::Halted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unhandled_cycle_error_is_fatal() {
    let mode = Mode {
        fail_cycles: 1,
        handle: false,
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    assert!(eventually(|| w.status() == RunningStatus::ExceptionThrown, SECOND).await);
    assert_eq!(
        w.last_error(),
        Some(WorkerError::CycleExecution {
            error: "boom".into()
        })
    );
    assert_eq!(probe.init.load(Ordering::SeqCst), 1);
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handled_error_without_restart_policy_is_fatal() {
    let mode = Mode {
        fail_cycles: 1,
        handle: true,
        ..Mode::default()
    };
    let cfg = WorkerConfig::default().with_restart(RestartPolicy::Never);
    let (w, probe) = spawn(mode, cfg);
    w.run(SECOND).await.unwrap();

    assert!(eventually(|| w.status() == RunningStatus::ExceptionThrown, SECOND).await);
    assert_eq!(probe.init.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn initialization_error_is_classified() {
    let mode = Mode {
        fail_init: true,
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    assert_eq!(w.status(), RunningStatus::ExceptionThrown);
    assert_eq!(
        w.last_error(),
        Some(WorkerError::Initialization {
            error: "init boom".into()
        })
    );
    assert_eq!(probe.cycles.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_restart_is_fatal() {
    let mode = Mode {
        fail_init: true,
        handle: true,
        ..Mode::default()
    };
    let cfg = WorkerConfig::default()
        .with_restart(RestartPolicy::OnFailure)
        .with_backoff(BackoffPolicy::immediate());
    let (w, probe) = spawn(mode, cfg);
    w.run(Duration::ZERO).await.unwrap();

    assert!(eventually(|| w.status() == RunningStatus::ExceptionThrown, SECOND).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.init.load(Ordering::SeqCst), 2);
    assert_eq!(probe.cycles.load(Ordering::SeqCst), 0);
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
    assert_eq!(
        w.last_error(),
        Some(WorkerError::Initialization {
            error: "init boom".into()
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forced_stop_during_initialize() {
    let mode = Mode {
        init_pause: Duration::from_millis(300),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(Duration::ZERO).await.unwrap();
    assert!(eventually(|| probe.init.load(Ordering::SeqCst) == 1, SECOND).await);

    w.terminate(true);
    assert_eq!(w.status(), RunningStatus::Aborted);
    w.wait_termination(SECOND).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(w.status(), RunningStatus::Aborted);
    assert_eq!(probe.cycles.load(Ordering::SeqCst), 0);
    assert!(!probe.cleanup_started.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn escalation_while_halting_mid_cycle() {
    let mode = Mode {
        cycle_pause: Duration::from_millis(300),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    assert!(eventually(|| probe.cycles.load(Ordering::SeqCst) > 0, SECOND).await);

    w.terminate(false);
    assert_eq!(w.status(), RunningStatus::Halting);
    w.terminate(true);
    assert_eq!(w.status(), RunningStatus::Aborted);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(w.status(), RunningStatus::Aborted);
    assert!(!probe.cleanup_started.load(Ordering::SeqCst));
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rerun_waits_for_its_own_initialize() {
    let mode = Mode {
        init_pause: Duration::from_millis(30),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    for round in 1..=5 {
        w.run(SECOND).await.unwrap();
        assert_eq!(probe.init.load(Ordering::SeqCst), round);
        assert!(eventually(|| probe.cycles.load(Ordering::SeqCst) > 0, SECOND).await);
        assert_eq!(w.status(), RunningStatus::Running);

        w.terminate(false);
        w.wait_termination(SECOND).await.unwrap();
        assert_eq!(w.status(), RunningStatus::Halted);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cleanup_error_aborts_on_cleanup() {
    let mode = Mode {
        fail_cleanup: true,
        handle: true,
        ..Mode::default()
    };
    let (w, _) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();

    assert_eq!(w.status(), RunningStatus::AbortedOnCleanup);
    assert_eq!(
        w.last_error(),
        Some(WorkerError::Cleanup {
            error: "cleanup boom".into()
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cycle_returning_false_halts() {
    let mode = Mode {
        stop_after: Some(3),
        ..Mode::default()
    };
    let (w, probe) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    assert!(eventually(|| w.status() == RunningStatus::Halted, SECOND).await);
    assert_eq!(probe.cycles.load(Ordering::SeqCst), 3);
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 1);
    assert_eq!(w.cycles().get(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_cycle_is_a_cycle_error() {
    let mode = Mode {
        panic_in_cycle: true,
        ..Mode::default()
    };
    let (w, _) = spawn(mode, WorkerConfig::default());
    w.run(SECOND).await.unwrap();

    assert!(eventually(|| w.status() == RunningStatus::ExceptionThrown, SECOND).await);
    match w.last_error() {
        Some(WorkerError::CycleExecution { error }) => assert!(error.contains("cycle exploded")),
        other => panic!("unexpected last error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn halted_worker_can_run_again() {
    let (w, probe) = spawn(Mode::default(), WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();

    w.run(SECOND).await.unwrap();
    assert_eq!(w.status(), RunningStatus::Running);
    assert_eq!(probe.init.load(Ordering::SeqCst), 2);

    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();
    assert_eq!(probe.cleanup.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_is_noop_while_running() {
    let (w, probe) = spawn(Mode::default(), WorkerConfig::default());
    w.run(SECOND).await.unwrap();
    w.run(SECOND).await.unwrap();
    assert_eq!(probe.init.load(Ordering::SeqCst), 1);
    w.dispose();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lifecycle_events_are_published() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();
    let (w, _) = spawn(Mode::default(), WorkerConfig::default().with_bus(bus));
    w.run(SECOND).await.unwrap();
    w.terminate(false);
    w.wait_termination(SECOND).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        assert_eq!(ev.worker.as_deref(), Some("TEST"));
        kinds.push(ev.kind);
    }
    for expected in [
        EventKind::WorkerStarting,
        EventKind::WorkerInitialized,
        EventKind::HaltRequested,
        EventKind::WorkerHalted,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unresponsive_unit_is_orphaned() {
    struct Stubborn;

    #[async_trait]
    impl Worker for Stubborn {
        async fn run_single_cycle(&mut self, _ctx: &WorkerContext) -> Result<bool, WorkerError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(true)
        }
    }

    let bus = Bus::new(64);
    let mut rx = bus.subscribe();
    let cfg = WorkerConfig {
        orphan_grace: Duration::from_millis(50),
        ..WorkerConfig::default().with_bus(bus)
    };
    let w = WorkerHandle::new("stubborn", Stubborn, cfg);
    w.run(SECOND).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    w.terminate(true);
    assert_eq!(w.status(), RunningStatus::Aborted);

    let orphaned = tokio::time::timeout(SECOND, async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == EventKind::WorkerOrphaned => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    })
    .await;
    assert!(matches!(orphaned, Ok(true)));
}
