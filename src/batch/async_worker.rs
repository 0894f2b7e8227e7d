//! # Asynchronous batch worker.
//!
//! Each request is started on its own tokio task as soon as it is drained, so
//! slow requests overlap. The batch triggers are the same as in the
//! synchronous variant; a flush waits for every member and reports them in
//! arrival order.
//!
//! ## Rules
//! - Requests are *started* in arrival order.
//! - At most `max_in_flight` requests run at once (`0` = unbounded); the
//!   cycle waits for a permit, the producer never does.
//! - A failing or panicking request is reported with `succeeded = false`
//!   alongside the rest of its batch; the first such error then fails the
//!   worker's cycle.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::accumulator::Accumulator;
use super::config::BatchConfig;
use super::request::{BatchMessage, REQUEST_KIND, RequestObjectMessage};
use crate::core::WorkerContext;
use crate::error::WorkerError;
use crate::events::{Event, EventKind};
use crate::messages::{Message, MessageHandler, MessageId, MessageRegistry, Payload};

/// A running request: its container always comes back, with the error if any.
type InFlight<R> = JoinHandle<(RequestObjectMessage<R>, Option<WorkerError>)>;

/// Request logic of an [`AsyncBatchWorker`]. Shared by concurrent requests.
#[async_trait]
pub trait AsyncRequestHandler: Send + Sync + 'static {
    /// Request type accumulated into batches.
    type Request: Send + 'static;
    /// Non-request traffic; use [`std::convert::Infallible`] for none.
    type Message: Payload;

    /// Declares additional handled kinds; requests are always registered.
    fn register_messages(&self, _registry: &MessageRegistry) {}

    /// Runs once per (re)start.
    async fn initialize(&self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// Handles one request on its own task. An `Err` marks the request
    /// unsuccessful, is reported with its batch and then fails the cycle.
    async fn handle_task_request(
        &self,
        ctx: &WorkerContext,
        container: &mut RequestObjectMessage<Self::Request>,
    ) -> Result<bool, WorkerError>;

    /// Receives each flushed batch, in arrival order.
    async fn handle_batch_completed(
        &self,
        ctx: &WorkerContext,
        batch: Vec<RequestObjectMessage<Self::Request>>,
    ) -> Result<(), WorkerError>;

    /// Handles a non-request message on the worker's cycle.
    async fn handle_message(
        &self,
        _ctx: &WorkerContext,
        _msg: Message<Self::Message>,
    ) -> Result<bool, WorkerError> {
        Ok(true)
    }

    /// Runs once on graceful stop, after the final flush.
    async fn clean_up(&self, _ctx: &WorkerContext) -> Result<(), WorkerError> {
        Ok(())
    }

    /// See [`Worker::handle_exception`](crate::Worker::handle_exception).
    fn handle_exception(&self, _error: &WorkerError) -> bool {
        false
    }
}

/// Message handler running requests of an [`AsyncRequestHandler`] concurrently.
pub struct AsyncBatchWorker<H: AsyncRequestHandler> {
    handler: Arc<H>,
    limiter: Option<Arc<Semaphore>>,
    batch: Accumulator<InFlight<H::Request>>,
}

impl<H: AsyncRequestHandler> AsyncBatchWorker<H> {
    /// Wraps `handler` with the given batching rules.
    pub fn new(handler: H, cfg: BatchConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            limiter: cfg.concurrency_limit().map(|n| Arc::new(Semaphore::new(n))),
            batch: Accumulator::new(cfg),
        }
    }

    /// The shared handler.
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    async fn dispatch(
        &mut self,
        ctx: &WorkerContext,
        id: MessageId,
        request: H::Request,
    ) -> Result<(), WorkerError> {
        self.batch.open();
        let permit = match &self.limiter {
            Some(sem) => Some(
                sem.clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::fail("request limiter closed"))?,
            ),
            None => None,
        };
        let handler = self.handler.clone();
        let task_ctx = ctx.clone();

        let join = tokio::spawn(async move {
            let _permit = permit;
            let mut container = RequestObjectMessage::new(id, request);
            let outcome = AssertUnwindSafe(handler.handle_task_request(&task_ctx, &mut container))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(succeeded)) => {
                    container.succeeded = succeeded;
                    None
                }
                Ok(Err(err)) => Some(err),
                Err(_panic) => Some(WorkerError::fail(format!("request {id} panicked"))),
            };
            (container, error)
        });
        if self.batch.push(join) {
            self.flush(ctx).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, ctx: &WorkerContext) -> Result<(), WorkerError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let in_flight = self.batch.take();
        let mut items = Vec::with_capacity(in_flight.len());
        let mut first_error = None;
        for joined in join_all(in_flight).await {
            match joined {
                Ok((container, error)) => {
                    items.push(container);
                    if first_error.is_none() {
                        first_error = error;
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error =
                            Some(WorkerError::fail(format!("request task failed: {join_err}")));
                    }
                }
            }
        }
        if ctx.is_aborted() {
            return Err(WorkerError::ForcedTermination);
        }
        ctx.bus().publish(
            Event::new(EventKind::BatchCompleted)
                .with_worker(ctx.name())
                .with_batch_len(items.len()),
        );
        self.handler.handle_batch_completed(ctx, items).await?;
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl<H: AsyncRequestHandler> MessageHandler for AsyncBatchWorker<H> {
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
                self.dispatch(ctx, msg.id, request).await?;
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
                self.dispatch(ctx, msg.id, request).await?;
            }
        }
        self.flush(ctx).await?;
        self.handler.clean_up(ctx).await
    }

    fn handle_exception(&mut self, error: &WorkerError) -> bool {
        self.handler.handle_exception(error)
    }
}
