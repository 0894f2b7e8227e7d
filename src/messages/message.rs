//! Message types carried by a worker's mailbox.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique message identifier, assigned at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message body a worker can receive.
///
/// `kind` is the registration key checked by [`MessageRegistry`].
pub trait Payload: Send + 'static {
    /// Stable kind name of this message.
    fn kind(&self) -> &'static str;
}

impl Payload for Infallible {
    fn kind(&self) -> &'static str {
        match *self {}
    }
}

/// A delivered application message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<M> {
    /// Identifier assigned on enqueue.
    pub id: MessageId,
    /// Application payload.
    pub body: M,
}

/// Runtime-level instructions that travel through the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Stop gracefully once the messages ahead of this one are handled.
    Terminate,
}

/// Anything a mailbox can hold.
#[derive(Debug)]
pub enum Envelope<M> {
    /// Runtime instruction.
    Control(ControlMessage),
    /// Application message.
    Payload(Message<M>),
}

/// Set of message kinds a worker declared it handles.
///
/// Empty means "accept everything silently". Shared between a handle and
/// its worker.
#[derive(Clone, Default, Debug)]
pub struct MessageRegistry {
    kinds: Arc<RwLock<HashSet<&'static str>>>,
}

impl MessageRegistry {
    /// Declares `kind` as handled. Idempotent.
    pub fn register(&self, kind: &'static str) {
        self.kinds.write().insert(kind);
    }

    /// `kind` was declared.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.read().contains(kind)
    }

    /// No kind was declared.
    pub fn is_empty(&self) -> bool {
        self.kinds.read().is_empty()
    }

    /// A message of `kind` would be reported as unregistered.
    pub fn rejects(&self, kind: &str) -> bool {
        let kinds = self.kinds.read();
        !kinds.is_empty() && !kinds.contains(kind)
    }
}
