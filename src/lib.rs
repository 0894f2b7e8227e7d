//! # workvisor
//!
//! **Workvisor** is a supervised worker runtime for Rust.
//!
//! A *worker* is a long-lived execution unit running the
//! `initialize → run_single_cycle* → clean_up` protocol. The runtime owns its
//! lifecycle: start, graceful or forced stop, restart after handled failures,
//! and bounded waits for termination. Message workers add a mailbox, batch
//! workers group requests, and a supervisor ties a set of workers to one shared
//! fate.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//!     │ impl Worker      │  │ impl MessageHdlr │  │ impl RequestHdlr │
//!     └────────┬─────────┘  └────────┬─────────┘  └────────┬─────────┘
//!              ▼                     ▼                     ▼
//!       WorkerHandle        MessageWorkerHandle    SyncBatchWorker / AsyncBatchWorker
//!              │                     │  (mailbox)          │ (inside a MessageWorkerHandle)
//!              └──────────┬──────────┴─────────────────────┘
//!                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (itself a worker)                                     │
//! │  - Registry (name → Arc<dyn Supervised>)                          │
//! │  - polls children; an unplanned child stop aborts everything     │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼ every unit publishes
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼
//!                    SubscriberSet (per-subscriber queues)
//!                        ▼                  ▼
//!                   LogWriter         your Subscribe impl
//! ```
//!
//! ### Status machine
//! ```text
//! None ─run─► Running ─terminate─► Halting ─clean_up ok─► Halted
//!               │  └─ error, not handled ─► ExceptionThrown
//!               │  └─ error, handled + OnFailure ─► backoff ─► initialize again
//!               └─ terminate(force) ─► Aborted (AbortedOnCleanup inside clean_up)
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Workers**       | Lifecycle state machine around user hooks.                | [`Worker`], [`WorkerHandle`], [`RunningStatus`] |
//! | **Messages**      | Mailbox-driven workers with kind registration.            | [`MessageHandler`], [`MessageWorkerHandle`] |
//! | **Batching**      | Size/timeout-triggered request batches, sync or async.    | [`SyncRequestHandler`], [`AsyncRequestHandler`], [`BatchConfig`] |
//! | **Supervision**   | Groups of workers with shared failure propagation.        | [`Supervisor`], [`Supervised`]              |
//! | **Policies**      | Restart and backoff after handled failures.               | [`RestartPolicy`], [`BackoffPolicy`]        |
//! | **Events**        | Lifecycle events for logging and custom subscribers.      | [`Bus`], [`Event`], [`Subscribe`]           |
//! | **Errors**        | Typed errors for hooks and for lifecycle callers.         | [`WorkerError`], [`RuntimeError`]           |
//! | **Primitives**    | Counters, queues and a parallel stress runner.            | [`CycleCounter`], [`ConcurrentQueue`], [`ParallelRunner`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which forwards events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use workvisor::{RunningStatus, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerHandle};
//!
//! struct Heartbeat;
//!
//! #[async_trait]
//! impl Worker for Heartbeat {
//!     async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
//!         ctx.sleep(Duration::from_millis(10)).await?;
//!         Ok(true)
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = WorkerHandle::new("heartbeat", Heartbeat, WorkerConfig::default());
//!     worker.run(Duration::from_secs(1)).await?;
//!
//!     worker.terminate(false);
//!     worker.wait_termination(Duration::from_secs(1)).await?;
//!     assert_eq!(worker.status(), RunningStatus::Halted);
//!     Ok(())
//! }
//! ```
mod batch;
mod core;
mod error;
mod events;
mod messages;
mod policies;
mod primitives;
mod subscribers;

// ---- Public re-exports ----

pub use batch::{
    AsyncBatchWorker, AsyncRequestHandler, BatchConfig, BatchMessage, BatchWorkerHandle,
    REQUEST_KIND, RequestObjectMessage, SyncBatchWorker, SyncRequestHandler,
};
pub use crate::core::{
    RunningStatus, Supervised, Supervisor, SupervisorConfig, Worker, WorkerConfig, WorkerContext,
    WorkerHandle, shutdown_signal,
};
pub use error::{RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind, Level};
pub use messages::{
    ControlMessage, Envelope, Message, MessageHandler, MessageId, MessageRegistry,
    MessageWorkerHandle, Payload,
};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use primitives::{ConcurrentQueue, CycleCounter, ParallelReport, ParallelRunner};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: forward runtime events to `tracing`.
// Enabled by default: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
