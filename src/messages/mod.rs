//! Message-driven workers.
//!
//! - [`message`]: payload contract, envelopes, ids and the kind registry;
//! - [`mailbox`]: the multi-producer queue feeding one worker;
//! - [`worker`]: [`MessageHandler`] and the worker driving it;
//! - [`handle`]: [`MessageWorkerHandle`], the producer-facing API.

mod handle;
mod mailbox;
mod message;
mod worker;

pub use handle::MessageWorkerHandle;
pub use message::{ControlMessage, Envelope, Message, MessageId, MessageRegistry, Payload};
pub use worker::MessageHandler;
