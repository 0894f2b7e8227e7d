//! # Synchronous batch worker.
//!
//! Requests are handled one by one inside the worker's own cycle, in arrival
//! order; the producer never waits for them.
//!
//! ## Flow
//! ```text
//! Request(r) ─► handle_task_request(&mut container) ─► push into batch
//!                 (Err: pushed with succeeded = false,  └─ size reached ─► flush
//!                  then the error is raised)
//! after each drain: timeout reached (or no trigger configured) ─► flush
//! clean_up: remaining queued requests are handled, then the last partial batch is flushed
//! flush ─► BatchCompleted event ─► handle_batch_completed(batch)
//! ```

use async_trait::async_trait;
use tokio::time::Instant;

use super::accumulator::Accumulator;
use super::config::BatchConfig;
use super::request::{BatchMessage, REQUEST_KIND, RequestObjectMessage};
use crate::core::WorkerContext;
use crate::error::WorkerError;
use crate::events::{Event, EventKind};
use crate::messages::{Message, MessageHandler, MessageId, MessageRegistry, Payload};

/// Request logic of a [`SyncBatchWorker`].
#[async_trait]
pub trait SyncRequestHandler: Send + 'static {
    /// Request type accumulated into batches.
    type Request: Send + 'static;
    /// Non-request traffic; use [`std::convert::Infallible`] for none.
    type Message: Payload;

    /// Declares additional handled kinds; requests are always registered.
    fn register_messages(&self, _registry: &MessageRegistry) {}

    /// Runs once per (re)start.
    async fn initialize(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Handles one request. `Ok(false)` marks it unsuccessful without failing the batch;
    /// `Err` also keeps it in the batch (unsuccessful) and then fails the cycle.
    async fn handle_task_request(
        &mut self,
        ctx: &WorkerContext,
        container: &mut RequestObjectMessage<Self::Request>,
    ) -> Result<bool, WorkerError>;

    /// Receives each flushed batch, in arrival order.
    async fn handle_batch_completed(
        &mut self,
        ctx: &WorkerContext,
        batch: Vec<RequestObjectMessage<Self::Request>>,
    ) -> Result<(), WorkerError>;

    /// Handles a non-request message.
    async fn handle_message(
        &mut self,
        _ctx: &WorkerContext,
        _msg: Message<Self::Message>,
    ) -> Result<bool, WorkerError> {
        Ok(true)
    }

    /// Runs once on graceful stop, after the final flush.
    async fn clean_up(&mut self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// See [`Worker::handle_exception`](crate::Worker::handle_exception).
    fn handle_exception(&mut self, _error: &WorkerError) -> bool {
        false
    }
}

/// Message handler batching requests for a [`SyncRequestHandler`].
///
/// Build the worker with
/// `MessageWorkerHandle::new(name, SyncBatchWorker::new(handler, cfg), worker_cfg)`.
pub struct SyncBatchWorker<H: SyncRequestHandler> {
    handler: H,
    batch: Accumulator<RequestObjectMessage<H::Request>>,
}

impl<H: SyncRequestHandler> SyncBatchWorker<H> {
    /// Wraps `handler` with the given batching rules.
    pub fn new(handler: H, cfg: BatchConfig) -> Self {
        Self {
            handler,
            batch: Accumulator::new(cfg),
        }
    }

    async fn process(
        &mut self,
        ctx: &WorkerContext,
        id: MessageId,
        request: H::Request,
    ) -> Result<(), WorkerError> {
        self.batch.open();
        let mut container = RequestObjectMessage::new(id, request);
        let outcome = self.handler.handle_task_request(ctx, &mut container).await;
        if matches!(outcome, Err(WorkerError::ForcedTermination)) {
            return outcome.map(|_| ());
        }
        container.succeeded = matches!(outcome, Ok(true));
        if self.batch.push(container) {
            self.flush(ctx).await?;
        }
        outcome.map(|_| ())
    }

    async fn flush(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let items = self.batch.take();
        ctx.bus().publish(
            Event::new(EventKind::BatchCompleted)
                .with_worker(ctx.name())
                .with_batch_len(items.len()),
        );
        self.handler.handle_batch_completed(ctx, items).await
    }
}

#[async_trait]
impl<H: SyncRequestHandler> MessageHandler for SyncBatchWorker<H> {
    type Message = BatchMessage<H::Request, H::Message>;

    fn register_messages(&self, registry: &MessageRegistry) {
        registry.register(REQUEST_KIND);
        self.handler.register_messages(registry);
    }

    fn max_messages_per_cycle(&self) -> usize {
        self.batch.config().max_messages_per_cycle
    }

    async fn initialize(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        self.handler.initialize(ctx).await
    }

    async fn handle_message(
        &mut self,
        ctx: &WorkerContext,
        msg: Message<Self::Message>,
    ) -> Result<bool, WorkerError> {
        match msg.body {
            BatchMessage::Request(request) => {
                self.process(ctx, msg.id, request).await?;
                Ok(true)
            }
            BatchMessage::Other(body) => {
                self.handler
                    .handle_message(ctx, Message { id: msg.id, body })
                    .await
            }
        }
    }

    async fn after_drain(&mut self, ctx: &WorkerContext) -> Result<bool, WorkerError> {
        if self.batch.config().flushes_per_drain() || self.batch.is_due(Instant::now()) {
            self.flush(ctx).await?;
        }
        Ok(true)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.batch.deadline()
    }

    async fn clean_up(
        &mut self,
        ctx: &WorkerContext,
        undelivered: Vec<Message<Self::Message>>,
    ) -> Result<(), WorkerError> {
        for msg in undelivered {
            if let BatchMessage::Request(request) = msg.body {
                self.process(ctx, msg.id, request).await?;
            }
        }
        self.flush(ctx).await?;
        self.handler.clean_up(ctx).await
    }

    fn handle_exception(&mut self, error: &WorkerError) -> bool {
        self.handler.handle_exception(error)
    }
}
