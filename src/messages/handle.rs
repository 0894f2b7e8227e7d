//! Caller-side handle of a message-driven worker.

use std::time::Duration;

use async_trait::async_trait;

use super::mailbox::Mailbox;
use super::message::{ControlMessage, Envelope, Message, MessageId, MessageRegistry, Payload};
use super::worker::{MessageHandler, MessageWorker};
use crate::core::{RunningStatus, Supervised, WorkerConfig, WorkerHandle};
use crate::error::{RuntimeError, WorkerError};
use crate::primitives::CycleCounter;

/// Handle of a worker fed through a mailbox.
///
/// Clones share the worker and the mailbox.
pub struct MessageWorkerHandle<M> {
    worker: WorkerHandle,
    mailbox: Mailbox<M>,
    registry: MessageRegistry,
}

impl<M> Clone for MessageWorkerHandle<M> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
            mailbox: self.mailbox.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<M: Payload> MessageWorkerHandle<M> {
    /// Builds the worker in status `None`; `handler.register_messages` runs here.
    pub fn new<H>(name: impl AsRef<str>, handler: H, cfg: WorkerConfig) -> Self
    where
        H: MessageHandler<Message = M>,
    {
        let mailbox = Mailbox::new();
        let registry = MessageRegistry::default();
        handler.register_messages(&registry);
        let behaviour = MessageWorker::new(handler, mailbox.clone(), registry.clone());
        Self {
            worker: WorkerHandle::new(name, behaviour, cfg),
            mailbox,
            registry,
        }
    }

    /// Enqueues `body`. Messages sent before `run` wait in the mailbox.
    ///
    /// # Errors
    /// [`RuntimeError::InvalidState`] after [`dispose`](Self::dispose).
    pub fn send_message(&self, body: M) -> Result<MessageId, RuntimeError> {
        let id = MessageId::next();
        self.enqueue(Envelope::Payload(Message { id, body }), "send a message to")?;
        Ok(id)
    }

    /// Enqueues a graceful stop behind the messages already queued.
    pub fn send_terminate(&self) -> Result<(), RuntimeError> {
        self.enqueue(Envelope::Control(ControlMessage::Terminate), "send terminate to")
    }

    /// Declares `kind` as handled.
    pub fn register_message(&self, kind: &'static str) {
        self.registry.register(kind);
    }

    /// Declared message kinds.
    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// Messages waiting in the mailbox (snapshot).
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// The underlying lifecycle handle.
    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    /// Normalised worker name.
    pub fn name(&self) -> &str {
        self.worker.name()
    }

    /// Current status.
    pub fn status(&self) -> RunningStatus {
        self.worker.status()
    }

    /// Most recent failure of the current run.
    pub fn last_error(&self) -> Option<WorkerError> {
        self.worker.last_error()
    }

    /// Completed cycles.
    pub fn cycles(&self) -> CycleCounter {
        self.worker.cycles()
    }

    /// See [`WorkerHandle::run`].
    pub async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        self.worker.run(wait).await
    }

    /// See [`WorkerHandle::terminate`].
    pub fn terminate(&self, force: bool) {
        self.worker.terminate(force)
    }

    /// See [`WorkerHandle::wait_termination`].
    pub async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        self.worker.wait_termination(timeout).await
    }

    /// Forcibly stops the worker and closes the mailbox. Idempotent.
    pub fn dispose(&self) {
        self.worker.dispose();
        self.mailbox.close();
    }

    fn enqueue(&self, env: Envelope<M>, operation: &'static str) -> Result<(), RuntimeError> {
        if self.mailbox.push(env) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidState {
                worker: self.name().to_string(),
                operation,
                status: self.status(),
            })
        }
    }
}

#[async_trait]
impl<M: Payload> Supervised for MessageWorkerHandle<M> {
    fn name(&self) -> &str {
        MessageWorkerHandle::name(self)
    }

    fn status(&self) -> RunningStatus {
        MessageWorkerHandle::status(self)
    }

    async fn run(&self, wait: Duration) -> Result<(), RuntimeError> {
        MessageWorkerHandle::run(self, wait).await
    }

    fn terminate(&self, force: bool) {
        MessageWorkerHandle::terminate(self, force)
    }

    async fn wait_termination(&self, timeout: Duration) -> Result<(), RuntimeError> {
        MessageWorkerHandle::wait_termination(self, timeout).await
    }

    fn dispose(&self) {
        MessageWorkerHandle::dispose(self)
    }
}
