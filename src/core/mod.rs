//! Runtime core: worker lifecycle and supervision.
//!
//! Public API: [`Worker`], [`WorkerContext`], [`WorkerHandle`], [`RunningStatus`],
//! [`Supervisor`], [`Supervised`] and the two config structs.
//!
//! Internal modules:
//! - [`control`]: shared lifecycle state and every status transition;
//! - [`runner`]: the execution unit driving hooks, failures and restarts;
//! - [`registry`]: children of a supervisor;
//! - [`shutdown`]: cross-platform termination signals.

mod config;
mod control;
mod handle;
mod registry;
mod runner;
mod shutdown;
mod status;
mod supervisor;
mod worker;

pub use config::{SupervisorConfig, WorkerConfig};
pub use handle::WorkerHandle;
pub use shutdown::shutdown_signal;
pub use status::RunningStatus;
pub use supervisor::{Supervised, Supervisor};
pub use worker::{Worker, WorkerContext};
