//! # Message-driven workers.
//!
//! A [`MessageHandler`] reacts to messages; the runtime wraps it in a worker
//! whose cycle waits for traffic, drains the mailbox and dispatches.
//!
//! ## One cycle
//! ```text
//! nothing pending? ── wait for: message | halt | min(idle_wait, next_deadline)
//! pending += drain(max_messages_per_cycle)
//! for each envelope:
//!   Control(Terminate) ─► request halt, stop dispatching
//!   Payload(msg)       ─► (UnregisteredMessage event if undeclared) ─► handle_message
//!                           └─ Ok(false) ─► end the loop gracefully
//! after_drain
//! ```
//!
//! Envelopes left over by an early exit or a failure stay pending: a restarted
//! worker sees them first, a stopping one hands them to `clean_up`.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::time::Instant;

use super::mailbox::Mailbox;
use super::message::{ControlMessage, Envelope, Message, MessageRegistry, Payload};
use crate::core::{Worker, WorkerContext};
use crate::error::WorkerError;
use crate::events::{Event, EventKind};

/// Behaviour of a message-driven worker.
///
/// Only `handle_message` is required.
#[async_trait]
pub trait MessageHandler: Send + 'static {
    /// Application message type.
    type Message: Payload;

    /// Declares handled kinds. Called once when the handle is built.
    fn register_messages(&self, _registry: &MessageRegistry) {}

    /// Upper bound of messages taken per cycle; `0` takes everything queued.
    fn max_messages_per_cycle(&self) -> usize {
        0
    }

    /// Runs once per (re)start.
    async fn initialize(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Handles one message. `Ok(false)` ends the cycle loop gracefully.
    async fn handle_message(
        &mut self,
        ctx: &WorkerContext,
        msg: Message<Self::Message>,
    ) -> Result<bool, WorkerError>;

    /// Runs after every cycle, also when no message arrived.
    async fn after_drain(&mut self, _ctx: &WorkerContext) -> Result<bool, WorkerError> {
        Ok(true)
    }

    /// Earliest moment the handler wants `after_drain` to run again.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Runs once on graceful stop with every message that was never handled.
    async fn clean_up(
        &mut self,
        _ctx: &WorkerContext,
        _undelivered: Vec<Message<Self::Message>>,
    ) -> Result<(), WorkerError> {
        Ok(())
    }

    /// See [`Worker::handle_exception`].
    fn handle_exception(&mut self, _error: &WorkerError) -> bool {
        false
    }
}

pub(crate) struct MessageWorker<H: MessageHandler> {
    handler: H,
    mailbox: Mailbox<H::Message>,
    registry: MessageRegistry,
    pending: VecDeque<Envelope<H::Message>>,
}

impl<H: MessageHandler> MessageWorker<H> {
    pub(crate) fn new(handler: H, mailbox: Mailbox<H::Message>, registry: MessageRegistry) -> Self {
        Self {
            handler,
            mailbox,
            registry,
            pending: VecDeque::new(),
        }
    }

    fn limit(&self) -> Option<usize> {
        match self.handler.max_messages_per_cycle() {
            0 => None,
            n => Some(n),
        }
    }
}

#[async_trait]
impl<H: MessageHandler> Worker for MessageWorker<H> {
    async fn initialize(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.handler.initialize(ctx).await
    }

    async fn run_single_cycle(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        if self.pending.is_empty() {
            let idle = Instant::now() + ctx.config().idle_wait_clamped();
            let deadline = self.handler.next_deadline().map_or(idle, |d| d.min(idle));
            tokio::select! {
                _ = ctx.halted() => return Ok(true),
                _ = self.mailbox.ready(deadline) => {}
            }
        }

        let room = self.limit().map(|n| n.saturating_sub(self.pending.len()));
        self.pending.extend(self.mailbox.drain(room));

        while let Some(env) = self.pending.pop_front() {
            match env {
                Envelope::Control(ControlMessage::Terminate) => {
                    ctx.request_halt();
                    return Ok(true);
                }
                Envelope::Payload(msg) => {
                    let kind = msg.body.kind();
                    if self.registry.rejects(kind) {
                        ctx.bus().publish(
                            Event::new(EventKind::UnregisteredMessage)
                                .with_worker(ctx.name())
                                .with_reason(kind),
                        );
                    }
                    if !self.handler.handle_message(ctx, msg).await? {
                        return Ok(false);
                    }
                }
            }
        }

        self.handler.after_drain(ctx).await
    }

    async fn clean_up(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        let queued = self.mailbox.drain(None);
        let undelivered = self
            .pending
            .drain(..)
            .chain(queued)
            .filter_map(|env| match env {
                Envelope::Payload(msg) => Some(msg),
                Envelope::Control(_) => None,
            })
            .collect();
        self.handler.clean_up(ctx, undelivered).await
    }

    fn handle_exception(&mut self, error: &WorkerError) -> bool {
        self.handler.handle_exception(error)
    }
}
