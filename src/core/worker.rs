//! # Worker contract and the context handed to its hooks.
//!
//! A [`Worker`] supplies the behaviour; the runtime supplies the lifecycle.
//! Every hook receives a [`WorkerContext`] for cooperative cancellation.
//!
//! ## Hook order
//! ```text
//! initialize ──► run_single_cycle ──► run_single_cycle ──► ... ──► clean_up
//!      │                 │
//!      └── Err ──► handle_exception ──► restart (initialize again) | ExceptionThrown
//! ```
//!
//! ## Rules
//! - `run_single_cycle` returning `Ok(false)` ends the loop gracefully.
//! - Errors are classified by phase before `handle_exception` sees them.
//! - A hook should wait through [`WorkerContext::sleep`] (or select on
//!   [`WorkerContext::halted`]) rather than blocking the thread.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::config::WorkerConfig;
use crate::core::control::{Control, RunTokens};
use crate::error::WorkerError;
use crate::events::Bus;
use crate::primitives::CycleCounter;

/// Behaviour driven by the runtime.
///
/// Only `run_single_cycle` is required.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use std::time::Duration;
/// use workvisor::{Worker, WorkerContext, WorkerError};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Worker for Ticker {
///     async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
///         ctx.sleep(Duration::from_millis(100)).await?;
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + 'static {
    /// Runs once per (re)start, before the first cycle.
    async fn initialize(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// One unit of work. `Ok(false)` ends the cycle loop gracefully.
    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError>;

    /// Runs once after the cycle loop ends gracefully.
    async fn clean_up(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Offered every failure. `true` means "handled": the worker may restart.
    fn handle_exception(&mut self, _error: &WorkerError) -> bool {
        false
    }
}

/// View of the running unit passed to every hook.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct WorkerContext {
    control: Arc<Control>,
    tokens: RunTokens,
}

impl WorkerContext {
    pub(crate) fn new(control: Arc<Control>, tokens: RunTokens) -> Self {
        Self { control, tokens }
    }

    /// Normalised (upper-case) worker name.
    pub fn name(&self) -> &str {
        &self.control.name
    }

    /// A graceful (or forced) stop has been requested.
    pub fn is_halting(&self) -> bool {
        self.tokens.halt.is_cancelled()
    }

    /// A forced stop has been requested.
    pub fn is_aborted(&self) -> bool {
        self.tokens.force.is_cancelled()
    }

    /// Sleeps for `dur`.
    ///
    /// A graceful stop does not shorten the sleep; a forced stop ends it with
    /// [`WorkerError::ForcedTermination`], which the hook should propagate with `?`.
    pub async fn sleep(&self, dur: Duration) -> Result<(), WorkerError> {
        tokio::select! {
            biased;
            _ = self.tokens.force.cancelled() => Err(WorkerError::ForcedTermination),
            _ = tokio::time::sleep(dur) => Ok(()),
        }
    }

    /// Resolves once any stop has been requested.
    pub async fn halted(&self) {
        self.tokens.halt.cancelled().await
    }

    /// Requests a graceful stop of this worker from inside a hook.
    pub fn request_halt(&self) {
        self.control.request_halt();
    }

    /// Aborts this worker from inside a hook: the status becomes `Aborted`
    /// immediately and `clean_up` is skipped.
    pub fn abort(&self, reason: &str) {
        self.control.request_abort(Some(reason));
    }

    /// Completed cycles since construction.
    pub fn cycles(&self) -> &CycleCounter {
        &self.control.cycles
    }

    /// Bus the worker publishes to.
    pub fn bus(&self) -> &Bus {
        &self.control.cfg.bus
    }

    /// Worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.control.cfg
    }

    pub(crate) fn force_token(&self) -> &CancellationToken {
        &self.tokens.force
    }

    pub(crate) fn control(&self) -> &Arc<Control> {
        &self.control
    }

    pub(crate) fn generation(&self) -> u64 {
        self.tokens.generation
    }
}
