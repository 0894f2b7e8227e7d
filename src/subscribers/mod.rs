//! # Event subscribers for the workvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to deliver events from the [`Bus`](crate::Bus) without blocking
//! publishers.
//!
//! ## Architecture
//! ```text
//! runner / WorkerHandle / Supervisor ── publish(Event) ──► Bus ──► listener
//!                                                                    │
//!                                                     SubscriberSet::emit(&Event)
//!                                                   ┌────────┼──────────┐
//!                                                   ▼        ▼          ▼
//!                                              LogWriter  Metrics    Custom
//! ```
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], which forwards events to `tracing`.

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
