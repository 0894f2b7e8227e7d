//! # Supervisor: a worker that owns and watches other workers.
//!
//! The supervisor is itself a worker. Its unit starts every registered child,
//! then polls them; it stops its own children when it stops.
//!
//! ## Architecture
//! ```text
//! Supervisor ──► WorkerHandle(SupervisorLoop)
//!                     │ initialize:  run every child
//!                     │                └─ child cannot start ─► ChildLost (as below)
//!                     │ cycle:       sleep(poll_interval), inspect snapshot
//!                     │                └─ registered child terminal ─► ChildLost
//!                     │                     ─► force all children ─► abort self
//!                     └ clean_up:    terminate children, wait up to grace,
//!                                    force stragglers (GraceExceeded)
//! Registry: name ─► Arc<dyn Supervised>
//! ```
//!
//! ## Rules
//! - Names are unique within one supervisor.
//! - Children added while the supervisor runs are started immediately.
//! - A removed child is unregistered before it is stopped, so its stop is never
//!   mistaken for a loss.
//! - Forced termination of the supervisor cascades to every child.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use workvisor::{Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new("main", SupervisorConfig::default());
//!     // sup.add_worker(handle).await?;
//!     sup.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::core::config::SupervisorConfig;
use crate::core::handle::{WorkerHandle, normalize_name};
use crate::core::registry::{Child, Registry};
use crate::core::shutdown::shutdown_signal;
use crate::core::status::RunningStatus;
use crate::core::worker::{Worker, WorkerContext};
use crate::error::{RuntimeError, WorkerError};
use crate::events::{Event, EventKind};

/// Lifecycle surface a supervisor needs from its children.
#[async_trait]
pub trait Supervised: Send + Sync + 'static {
    /// Normalised name; the registry key.
    fn name(&self) -> &str;

    /// Current status.
    fn status(&self) -> RunningStatus;

    /// Starts the child (see [`WorkerHandle::run`]).
    async fn run(&self, wait: Duration) -> Result<(), RuntimeError>;

    /// Requests a graceful or forced stop.
    fn terminate(&self, force: bool);

    /// Waits for a terminal status (see [`WorkerHandle::wait_termination`]).
    async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError>;

    /// Releases the child; forcibly stops it if still active.
    fn dispose(&self);
}

#[async_trait]
impl Supervised for WorkerHandle {
    fn name(&self) -> &str {
        WorkerHandle::name(self)
    }

    fn status(&self) -> RunningStatus {
        WorkerHandle::status(self)
    }

    async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        WorkerHandle::run(self, wait).await
    }

    fn terminate(&self, force: bool) {
        WorkerHandle::terminate(self, force)
    }

    async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        WorkerHandle::wait_termination(self, timeout).await
    }

    fn dispose(&self) {
        WorkerHandle::dispose(self)
    }
}

/// The supervisor's own behaviour.
struct SupervisorLoop {
    registry: Arc<Registry>,
    poll_interval: Duration,
    grace: Duration,
}

impl SupervisorLoop {
    /// Shared fate: force every registered child, then abort the supervisor.
    fn lose_child(&self, ctx: &WorkerContext, name: &str, reason: &str) {
        ctx.bus().publish(
            Event::new(EventKind::ChildLost)
                .with_worker(name)
                .with_reason(reason),
        );
        for (_, other) in self.registry.snapshot() {
            other.terminate(true);
        }
        ctx.abort(&format!("child {name} stopped unexpectedly"));
    }
}

#[async_trait]
impl Worker for SupervisorLoop {
    async fn initialize(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        for (name, child) in self.registry.snapshot() {
            if let Err(err) = child.run(Duration::ZERO).await {
                self.lose_child(ctx, &name, &err.to_string());
                return Ok(());
            }
        }
        Ok(())
    }

    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        tokio::select! {
            _ = ctx.halted() => return Ok(true),
            slept = ctx.sleep(self.poll_interval) => slept?,
        }

        for (name, child) in self.registry.snapshot() {
            let status = child.status();
            if !status.is_terminal() || !self.registry.holds(&name, &child) {
                continue;
            }
            self.lose_child(ctx, &name, &format!("{status:?} under {}", ctx.name()));
            return Ok(false);
        }
        Ok(true)
    }

    async fn clean_up(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let children = self.registry.snapshot();
        for (_, child) in &children {
            child.terminate(false);
        }
        join_all(children.iter().map(|(_, c)| c.wait_termination(self.grace))).await;

        let stuck: Vec<String> = children
            .iter()
            .filter(|(_, c)| !c.status().is_terminal())
            .map(|(n, _)| n.clone())
            .collect();
        if !stuck.is_empty() {
            for (_, child) in children.iter().filter(|(n, _)| stuck.contains(n)) {
                child.terminate(true);
            }
            ctx.bus().publish(
                Event::new(EventKind::GraceExceeded)
                    .with_worker(ctx.name())
                    .with_reason(stuck.join(","))
                    .with_timeout(self.grace),
            );
        }
        Ok(())
    }
}

/// A named group of workers with a shared lifecycle.
#[derive(Clone)]
pub struct Supervisor {
    handle: WorkerHandle,
    registry: Arc<Registry>,
    cfg: SupervisorConfig,
}

impl Supervisor {
    /// Creates a supervisor in status `None` with no children.
    pub fn new(name: impl AsRef<str>, cfg: SupervisorConfig) -> Self {
        let registry = Arc::new(Registry::default());
        let behaviour = SupervisorLoop {
            registry: registry.clone(),
            poll_interval: cfg.poll_interval_clamped(),
            grace: cfg.grace,
        };
        let handle = WorkerHandle::new(name, behaviour, cfg.worker.clone());
        Self {
            handle,
            registry,
            cfg,
        }
    }

    /// Normalised supervisor name.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Registers a child; starts it when the supervisor is running.
    ///
    /// # Errors
    /// - [`RuntimeError::DuplicateWorker`] if the name is taken
    /// - whatever starting the child returns (the child is unregistered again)
    pub async fn add_worker<C: Supervised>(&self, child: C) -> Result<(), RuntimeError> {
        let child: Child = Arc::new(child);
        self.registry.insert(child.clone())?;
        self.publish_child(EventKind::ChildAdded, child.name());

        if self.handle.status() == RunningStatus::Running {
            if let Err(err) = child.run(Duration::ZERO).await {
                let _ = self.registry.remove(child.name());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Unregisters `child` and requests its graceful stop.
    pub fn remove_worker<C: Supervised>(&self, child: &C) -> Result<(), RuntimeError> {
        self.remove_worker_by_name(child.name())
    }

    /// Unregisters the child called `name` and requests its graceful stop.
    ///
    /// Does not wait; use the child's own `wait_termination` for that.
    pub fn remove_worker_by_name(&self, name: &str) -> Result<(), RuntimeError> {
        let child = self.registry.remove(&normalize_name(name))?;
        child.terminate(false);
        self.publish_child(EventKind::ChildRemoved, child.name());
        Ok(())
    }

    /// Registered child names, sorted.
    pub fn children(&self) -> Vec<String> {
        self.registry.names()
    }

    /// The child registered under `name`.
    pub fn child(&self, name: &str) -> Option<Arc<dyn Supervised>> {
        self.registry.get(&normalize_name(name))
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// No child is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Aggregated status.
    ///
    /// The supervisor's own status unless it is `Running`; then the status of
    /// the first (by name) child that is not `Running`, if any.
    pub fn status(&self) -> RunningStatus {
        let own = self.handle.status();
        if own != RunningStatus::Running {
            return own;
        }
        self.registry
            .snapshot()
            .into_iter()
            .map(|(_, c)| c.status())
            .find(|s| *s != RunningStatus::Running)
            .unwrap_or(RunningStatus::Running)
    }

    /// Status of the supervisor's own unit.
    pub fn own_status(&self) -> RunningStatus {
        self.handle.status()
    }

    /// Most recent failure of the supervisor's own unit.
    pub fn last_error(&self) -> Option<WorkerError> {
        self.handle.last_error()
    }

    /// Starts the supervisor, which starts every child.
    pub async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        self.handle.run(wait).await
    }

    /// Graceful stop stops the children during clean-up; forced stop
    /// aborts the supervisor first, then every child.
    pub fn terminate(&self, force: bool) {
        self.handle.terminate(force);
        if force {
            for (_, child) in self.registry.snapshot() {
                child.terminate(true);
            }
        }
    }

    /// Waits for the supervisor's own unit to stop.
    pub async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        self.handle.wait_termination(timeout).await
    }

    /// Aborts the supervisor and disposes every child.
    pub fn dispose(&self) {
        self.handle.dispose();
        for (_, child) in self.registry.snapshot() {
            child.dispose();
        }
    }

    /// Runs until a termination signal arrives or the supervisor stops on its own.
    ///
    /// On a signal: graceful stop, then a forced one if the children did not
    /// finish within the grace period.
    ///
    /// # Errors
    /// - [`RuntimeError::Signal`] if signal listeners cannot be registered
    /// - [`RuntimeError::GraceExceeded`] if the forced stop was needed
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        self.run(Duration::ZERO).await?;
        tokio::select! {
            res = shutdown_signal() => {
                res?;
                self.handle
                    .config()
                    .bus
                    .publish(Event::new(EventKind::ShutdownRequested).with_worker(self.name()));
            }
            _ = self.handle.stopped() => return Ok(()),
        }

        self.terminate(false);
        // clean_up spends up to `grace` on the children; allow a little more for the unit itself.
        let budget = self.cfg.grace + self.cfg.poll_interval_clamped() * 2;
        match self.wait_termination(budget).await {
            Ok(()) => Ok(()),
            Err(RuntimeError::Timeout { .. }) => {
                let stuck = self
                    .registry
                    .snapshot()
                    .into_iter()
                    .filter(|(_, c)| !c.status().is_terminal())
                    .map(|(n, _)| n)
                    .collect();
                self.terminate(true);
                Err(RuntimeError::GraceExceeded {
                    grace: self.cfg.grace,
                    stuck,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn publish_child(&self, kind: EventKind, child: &str) {
        self.handle.config().bus.publish(
            Event::new(kind)
                .with_worker(child)
                .with_reason(format!("supervisor {}", self.name())),
        );
    }
}

#[async_trait]
impl Supervised for Supervisor {
    fn name(&self) -> &str {
        Supervisor::name(self)
    }

    fn status(&self) -> RunningStatus {
        Supervisor::status(self)
    }

    async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        Supervisor::run(self, wait).await
    }

    fn terminate(&self, force: bool) {
        Supervisor::terminate(self, force)
    }

    async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        Supervisor::wait_termination(self, timeout).await
    }

    fn dispose(&self) {
        Supervisor::dispose(self)
    }
}
