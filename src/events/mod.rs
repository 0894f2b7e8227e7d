//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** through which
//! workers, supervisors and subscriber workers report what they do. The bus is
//! the runtime's logging capability: with no subscribers attached, publishing is
//! a no-op, which is how workers run headless.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Level`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::runner` (lifecycle), `WorkerHandle` (halt/abort/orphan),
//!   message and batch workers (diagnostics, batch completion), `Supervisor`
//!   (children).
//! - **Consumers**: the listener spawned by [`Bus::with_subscribers`], fanning out
//!   to a [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Level};
