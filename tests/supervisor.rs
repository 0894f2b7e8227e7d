//! Supervision: registration, status aggregation and failure propagation.

use std::time::Duration;

use async_trait::async_trait;
use workvisor::{
    Bus, EventKind, Message, MessageHandler, MessageWorkerHandle, Payload, RunningStatus,
    RuntimeError, Supervised, Supervisor, SupervisorConfig, WorkerConfig, WorkerContext,
    WorkerError,
};

#[derive(Debug)]
enum Cmd {
    Work,
    Quit,
}

impl Payload for Cmd {
    fn kind(&self) -> &'static str {
        match self {
            Cmd::Work => "work",
            Cmd::Quit => "quit",
        }
    }
}

struct Child {
    cleanup_pause: Duration,
}

#[async_trait]
impl MessageHandler for Child {
    type Message = Cmd;

    async fn handle_message(
        &mut self,
        _ctx: &WorkerContext,
        msg: Message<Cmd>,
    ) -> Result<bool, WorkerError> {
        Ok(!matches!(msg.body, Cmd::Quit))
    }

    async fn clean_up(
        &mut self,
        _ctx: &WorkerContext,
        _undelivered: Vec<Message<Cmd>>,
    ) -> Result<(), WorkerError> {
        tokio::time::sleep(self.cleanup_pause).await;
        Ok(())
    }
}

fn child(name: &str) -> MessageWorkerHandle<Cmd> {
    slow_child(name, Duration::ZERO)
}

fn slow_child(name: &str, cleanup_pause: Duration) -> MessageWorkerHandle<Cmd> {
    let cfg = WorkerConfig {
        idle_wait: Duration::from_millis(10),
        ..WorkerConfig::default()
    };
    MessageWorkerHandle::new(name, Child { cleanup_pause }, cfg)
}

fn supervisor(bus: Bus) -> Supervisor {
    let cfg = SupervisorConfig {
        poll_interval: Duration::from_millis(5),
        grace: Duration::from_secs(1),
        ..SupervisorConfig::default()
    }
    .with_bus(bus);
    Supervisor::new("sup", cfg)
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
async fn running_iff_all_children_running() {
    let sup = supervisor(Bus::silent());
    let children: Vec<_> = (0..3).map(|i| child(&format!("child-{i}"))).collect();
    for c in &children {
        sup.add_worker(c.clone()).await.unwrap();
    }
    assert_eq!(sup.children(), vec!["CHILD-0", "CHILD-1", "CHILD-2"]);
    assert_eq!(sup.status(), RunningStatus::None);

    sup.run(SECOND).await.unwrap();
    assert!(eventually(|| sup.status() == RunningStatus::Running, SECOND).await);
    assert!(children.iter().all(|c| c.status() == RunningStatus::Running));

    sup.terminate(false);
    sup.wait_termination(SECOND * 2).await.unwrap();
    assert_eq!(sup.status(), RunningStatus::Halted);
    assert!(children.iter().all(|c| c.status() == RunningStatus::Halted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_and_unknown_names_are_rejected() {
    let sup = supervisor(Bus::silent());
    sup.add_worker(child("a")).await.unwrap();

    let err = sup.add_worker(child("A")).await.unwrap_err();
    assert_eq!(err, RuntimeError::DuplicateWorker { name: "A".into() });

    let err = sup.remove_worker_by_name("missing").unwrap_err();
    assert_eq!(
        err,
        RuntimeError::UnknownWorker {
            name: "MISSING".into()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn removing_every_child_then_terminating_halts() {
    let sup = supervisor(Bus::silent());
    let children: Vec<_> = (0..3).map(|i| child(&format!("c{i}"))).collect();
    for c in &children {
        sup.add_worker(c.clone()).await.unwrap();
    }
    sup.run(SECOND).await.unwrap();
    assert!(eventually(|| sup.status() == RunningStatus::Running, SECOND).await);

    for c in &children {
        sup.remove_worker(c).unwrap();
        assert!(matches!(c.status(), RunningStatus::Halting | RunningStatus::Halted));
    }
    for c in &children {
        c.wait_termination(SECOND).await.unwrap();
    }
    // a removed child stopping is not a loss
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sup.own_status(), RunningStatus::Running);

    sup.terminate(false);
    sup.wait_termination(SECOND).await.unwrap();
    assert_eq!(sup.status(), RunningStatus::Halted);
    assert!(sup.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn child_stopping_on_its_own_aborts_everything() {
    let bus = Bus::new(256);
    let mut rx = bus.subscribe();
    let sup = supervisor(bus);
    let children: Vec<_> = (0..3).map(|i| child(&format!("w{i}"))).collect();
    for c in &children {
        sup.add_worker(c.clone()).await.unwrap();
    }
    sup.run(SECOND).await.unwrap();
    assert!(eventually(|| sup.status() == RunningStatus::Running, SECOND).await);

    children[0].send_message(Cmd::Quit).unwrap();

    assert!(eventually(|| sup.own_status() == RunningStatus::Aborted, SECOND).await);
    assert_eq!(sup.status(), RunningStatus::Aborted);
    assert_eq!(children[0].status(), RunningStatus::Halted);
    assert!(eventually(
        || children[1..].iter().all(|c| c.status().is_terminal()),
        SECOND
    )
    .await);
    assert_eq!(children[1].status(), RunningStatus::Aborted);

    let mut lost = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::ChildLost {
            lost.push(ev.worker.map(|w| w.to_string()));
        }
    }
    assert_eq!(lost, vec![Some("W0".to_string())]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unstartable_child_aborts_supervisor() {
    let bus = Bus::new(256);
    let mut rx = bus.subscribe();
    let sup = supervisor(bus);
    let healthy = child("a");
    let disposed = child("b");
    disposed.dispose();
    sup.add_worker(healthy.clone()).await.unwrap();
    sup.add_worker(disposed.clone()).await.unwrap();

    sup.run(SECOND).await.unwrap();

    assert!(eventually(|| sup.own_status() == RunningStatus::Aborted, SECOND).await);
    assert!(eventually(|| healthy.status() == RunningStatus::Aborted, SECOND).await);
    assert_eq!(disposed.status(), RunningStatus::Aborted);
    assert_eq!(sup.status(), RunningStatus::Aborted);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut lost = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::ChildLost {
            lost.push(ev.worker.map(|w| w.to_string()));
        }
    }
    assert_eq!(lost, vec![Some("B".to_string())]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forced_terminate_cascades() {
    let sup = supervisor(Bus::silent());
    let children: Vec<_> = (0..2).map(|i| child(&format!("f{i}"))).collect();
    for c in &children {
        sup.add_worker(c.clone()).await.unwrap();
    }
    sup.run(SECOND).await.unwrap();

    sup.terminate(true);
    assert_eq!(sup.own_status(), RunningStatus::Aborted);
    assert!(children.iter().all(|c| c.status() == RunningStatus::Aborted));
    sup.wait_termination(SECOND).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn child_added_while_running_is_started() {
    let sup = supervisor(Bus::silent());
    sup.run(SECOND).await.unwrap();

    let late = child("late");
    sup.add_worker(late.clone()).await.unwrap();
    assert_eq!(late.status(), RunningStatus::Running);
    assert!(sup.child("LATE").is_some());

    sup.dispose();
    assert_eq!(late.status(), RunningStatus::Aborted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stragglers_are_forced_after_grace() {
    let bus = Bus::new(256);
    let mut rx = bus.subscribe();
    let cfg = SupervisorConfig {
        poll_interval: Duration::from_millis(5),
        grace: Duration::from_millis(50),
        ..SupervisorConfig::default()
    }
    .with_bus(bus);
    let sup = Supervisor::new("strict", cfg);
    let slow = slow_child("slow", Duration::from_millis(500));
    sup.add_worker(slow.clone()).await.unwrap();
    sup.run(SECOND).await.unwrap();

    sup.terminate(false);
    sup.wait_termination(SECOND).await.unwrap();
    assert_eq!(sup.own_status(), RunningStatus::Halted);
    assert_eq!(slow.status(), RunningStatus::AbortedOnCleanup);

    let mut exceeded = false;
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::GraceExceeded {
            assert_eq!(ev.reason.as_deref(), Some("SLOW"));
            exceeded = true;
        }
    }
    assert!(exceeded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn supervisors_nest() {
    let outer = supervisor(Bus::silent());
    let inner = Supervisor::new("inner", SupervisorConfig::default());
    let leaf = child("leaf");
    inner.add_worker(leaf.clone()).await.unwrap();
    outer.add_worker(inner.clone()).await.unwrap();

    outer.run(SECOND).await.unwrap();
    assert!(eventually(|| outer.status() == RunningStatus::Running, SECOND).await);
    assert_eq!(Supervised::status(&inner), RunningStatus::Running);
    assert_eq!(leaf.status(), RunningStatus::Running);

    outer.terminate(false);
    outer.wait_termination(SECOND * 3).await.unwrap();
    assert_eq!(inner.own_status(), RunningStatus::Halted);
    assert_eq!(leaf.status(), RunningStatus::Halted);
}
