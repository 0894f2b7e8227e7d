//! Request batching on top of message workers.
//!
//! - [`BatchConfig`]: size / timeout triggers and drain limits;
//! - [`RequestObjectMessage`]: a request plus its correlation id and outcome;
//! - [`SyncBatchWorker`]: requests handled in the worker's own cycle;
//! - [`AsyncBatchWorker`]: requests handled concurrently on their own tasks.
//!
//! Both workers are [`MessageHandler`](crate::MessageHandler)s over
//! [`BatchMessage`]; run them through a [`BatchWorkerHandle`].
//!
//! ## Graceful stop
//! Requests still queued when the worker stops are handled during `clean_up`
//! and reported in batches of at most `batch_size`. A forced stop discards the
//! partial batch.

mod accumulator;
mod async_worker;
mod config;
mod request;
mod sync_worker;

pub use async_worker::{AsyncBatchWorker, AsyncRequestHandler};
pub use config::BatchConfig;
pub use request::{BatchMessage, REQUEST_KIND, RequestObjectMessage};
pub use sync_worker::{SyncBatchWorker, SyncRequestHandler};

use crate::error::RuntimeError;
use crate::messages::{MessageId, MessageWorkerHandle, Payload};

/// Handle of a batch worker.
pub type BatchWorkerHandle<R, M = std::convert::Infallible> = MessageWorkerHandle<BatchMessage<R, M>>;

impl<R: Send + 'static, M: Payload> MessageWorkerHandle<BatchMessage<R, M>> {
    /// Enqueues a request for batching.
    pub fn send_request(&self, request: R) -> Result<MessageId, RuntimeError> {
        self.send_message(BatchMessage::Request(request))
    }
}
