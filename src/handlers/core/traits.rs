//! The listener trait.

use crate::error::HandlerError;
use async_trait::async_trait;
use frank_proto::Message;

/// What a listener wants after processing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Stay registered.
    Continue,
    /// Done for good; the dispatcher removes the listener after this run.
    Remove,
}

pub type HandlerResult = Result<Flow, HandlerError>;

/// A listener invoked once for every inbound message.
///
/// Dispatch runs each invocation in its own task, so a handler may run
/// concurrently with itself when messages arrive faster than it finishes.
/// Any internal state has to stay correct under that reentrancy.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, msg: &Message) -> HandlerResult;
}
