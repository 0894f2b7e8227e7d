//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (every worker's execution
//! unit, lifecycle callers, supervisors).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Consumer:
//!   WorkerHandle ──┐
//!   runner       ──┼──────► Bus ───────► listener ────► SubscriberSet ──► LogWriter, ...
//!   Supervisor   ──┘  (broadcast chan)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: one ring buffer shared by all receivers; laggards skip.
//! - **Headless by default**: with no receivers, events are dropped silently.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::Event;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Default ring buffer size.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Bus {
    /// Creates a new bus with the given channel capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// A bus nobody listens to: the null logger.
    pub fn silent() -> Self {
        Self::new(1)
    }

    /// Creates a bus and spawns a listener that fans every event out to `subscribers`.
    ///
    /// Must be called from within a tokio runtime. The listener exits (and shuts
    /// the subscriber workers down) once every clone of the bus has been dropped.
    pub fn with_subscribers(capacity: usize, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Self::new(capacity);
        let set = SubscriberSet::new(subscribers);
        let mut rx = bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
        bus
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes subsequently published events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
