//! Request containers and the batch message type.

use std::convert::Infallible;

use crate::messages::{MessageId, Payload};

/// Kind under which batch requests are registered.
pub const REQUEST_KIND: &str = "request";

/// A caller request travelling through a batch, with its correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestObjectMessage<R> {
    /// Id assigned when the request was enqueued.
    pub id: MessageId,
    /// The request; handlers may write results into it.
    pub request: R,
    /// Outcome reported by the request handler.
    pub succeeded: bool,
}

impl<R> RequestObjectMessage<R> {
    pub(crate) fn new(id: MessageId, request: R) -> Self {
        Self {
            id,
            request,
            succeeded: false,
        }
    }
}

/// What a batch worker's mailbox carries.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchMessage<R, M = Infallible> {
    /// A request to accumulate.
    Request(R),
    /// Any other message, forwarded to the handler.
    Other(M),
}

impl<R: Send + 'static, M: Payload> Payload for BatchMessage<R, M> {
    fn kind(&self) -> &'static str {
        match self {
            BatchMessage::Request(_) => REQUEST_KIND,
            BatchMessage::Other(m) => m.kind(),
        }
    }
}
