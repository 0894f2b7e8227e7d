//! # Subscribing to worker lifecycle events.
//!
//! Anything that wants to watch workers, supervisors and batches without
//! touching their hooks implements [`Subscribe`] and is handed to
//! [`Bus::with_subscribers`](crate::Bus::with_subscribers).
//!
//! ## Delivery
//! ```text
//! Bus listener ──► SubscriberSet::emit ──try_send──► [queue, queue_capacity()] ──► on_event
//!                                        full ──► dropped for this subscriber (tracing warn)
//!                                                   on_event panics ──► caught (tracing error)
//! ```
//!
//! ## Rules
//! - Each subscriber sees events in publish order, one `on_event` at a time.
//! - A full queue drops the event for that subscriber only; workers never wait.
//! - A panic in `on_event` is caught and the next event is still delivered.
//! - Overflow and panics are reported through `tracing` (with the `logging`
//!   feature), never re-published on the bus, so a failing subscriber cannot
//!   flood itself.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use workvisor::{Event, EventKind, Subscribe};
//!
//! /// Counts requests reported through completed batches.
//! #[derive(Default)]
//! struct Throughput {
//!     requests: AtomicUsize,
//! }
//!
//! #[async_trait]
//! impl Subscribe for Throughput {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::BatchCompleted {
//!             self.requests.fetch_add(ev.batch_len.unwrap_or(0), Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "throughput"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receiver of runtime events, driven by its own task inside a
/// [`SubscriberSet`](crate::SubscriberSet).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called once per event. Long awaits here only delay this subscriber.
    async fn on_event(&self, event: &Event);

    /// Label attached to the `tracing` records about this subscriber.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
