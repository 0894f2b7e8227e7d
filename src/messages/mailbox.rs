//! # Mailbox: multi-producer queue with a wake-up signal.
//!
//! Producers push without blocking; the owning worker waits until something
//! arrives, a deadline passes, or a stop is requested.
//!
//! ## Rules
//! - A push that happens before the worker starts waiting is never lost
//!   (the notify permit is stored).
//! - After [`Mailbox::close`] pushes are refused.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::time::Instant;

use super::message::Envelope;
use crate::primitives::ConcurrentQueue;

/// Shared mailbox of one message worker.
pub(crate) struct Mailbox<M> {
    queue: ConcurrentQueue<Envelope<M>>,
    notify: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            notify: self.notify.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<M> Mailbox<M> {
    pub(crate) fn new() -> Self {
        Self {
            queue: ConcurrentQueue::new(),
            notify: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueues `env`; returns `false` once the mailbox is closed.
    pub(crate) fn push(&self, env: Envelope<M>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.queue.push(env);
        self.notify.notify_one();
        true
    }

    /// Takes up to `limit` envelopes in arrival order.
    pub(crate) fn drain(&self, limit: Option<usize>) -> Vec<Envelope<M>> {
        self.queue.drain(limit)
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits until the mailbox is non-empty or `deadline` passes.
    ///
    /// Callers race this against their own stop signal.
    pub(crate) async fn ready(&self, deadline: Instant) {
        loop {
            if !self.queue.is_empty() || self.is_closed() {
                return;
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(deadline) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::message::ControlMessage;
    use std::time::Duration;

    #[tokio::test]
    async fn push_before_wait_is_not_lost() {
        let mb: Mailbox<u8> = Mailbox::new();
        mb.push(Envelope::Control(ControlMessage::Terminate));
        let deadline = Instant::now() + Duration::from_secs(5);
        tokio::time::timeout(Duration::from_secs(1), mb.ready(deadline))
            .await
            .expect("mailbox should be ready");
        assert_eq!(mb.drain(None).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_returns_at_deadline() {
        let mb: Mailbox<u8> = Mailbox::new();
        let start = Instant::now();
        mb.ready(start + Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(mb.len(), 0);
    }

    #[test]
    fn closed_mailbox_refuses_pushes() {
        let mb: Mailbox<u8> = Mailbox::new();
        mb.close();
        assert!(!mb.push(Envelope::Control(ControlMessage::Terminate)));
        assert_eq!(mb.len(), 0);
    }
}
