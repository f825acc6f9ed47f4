//! Waiting for one specific reply.
//!
//! A correlation registers a temporary listener that watches for the reply to
//! something the bot just sent (a TOPIC query, a nickserv IDENTIFY). The first
//! matching message is delivered through a oneshot channel and the listener
//! asks to be removed. The waiting side removes it too, whether it got an
//! answer or timed out; removal is idempotent so both paths are safe.

use super::registry::{ListenerHandle, Registry};
use super::traits::{Flow, Handler, HandlerResult};
use crate::error::CorrelationError;
use async_trait::async_trait;
use frank_proto::Message;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

struct CorrelationHandler<T, F> {
    matcher: F,
    reply: Mutex<Option<oneshot::Sender<T>>>,
}

#[async_trait]
impl<T, F> Handler for CorrelationHandler<T, F>
where
    T: Send + 'static,
    F: Fn(&Message) -> Option<T> + Send + Sync + 'static,
{
    async fn handle(&self, msg: &Message) -> HandlerResult {
        let Some(value) = (self.matcher)(msg) else {
            return Ok(Flow::Continue);
        };
        // Concurrent invocations may both match; only the first one answers.
        if let Some(tx) = self.reply.lock().take() {
            let _ = tx.send(value);
        }
        Ok(Flow::Remove)
    }
}

/// A registered correlation listener awaiting its reply.
///
/// Dropping it without waiting removes the listener.
pub struct Correlation<T> {
    registry: Arc<Registry>,
    handle: ListenerHandle,
    description: String,
    reply: Option<oneshot::Receiver<T>>,
}

impl<T: Send + 'static> Correlation<T> {
    /// Register a listener that resolves with the first `Some` from `matcher`.
    ///
    /// Register before sending the request so the reply cannot be missed.
    pub fn register<F>(registry: &Arc<Registry>, description: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&Message) -> Option<T> + Send + Sync + 'static,
    {
        let description = description.into();
        let (tx, rx) = oneshot::channel();
        let handler = CorrelationHandler {
            matcher,
            reply: Mutex::new(Some(tx)),
        };
        let handle = registry.add(description.clone(), Arc::new(handler));
        Self {
            registry: Arc::clone(registry),
            handle,
            description,
            reply: Some(rx),
        }
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle
    }

    /// Wait up to `timeout` for the reply. The listener is gone afterwards.
    pub async fn wait(mut self, timeout: Duration) -> Result<T, CorrelationError> {
        let Some(rx) = self.reply.take() else {
            return Err(CorrelationError::Closed(self.description.clone()));
        };
        let outcome = tokio::time::timeout(timeout, rx).await;
        self.registry.remove(&self.handle);

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(CorrelationError::Closed(self.description.clone())),
            Err(_) => {
                debug!(listener = %self.description, ?timeout, "No reply in time");
                Err(CorrelationError::TimedOut {
                    description: self.description.clone(),
                    after: timeout,
                })
            }
        }
    }
}

impl<T> Drop for Correlation<T> {
    fn drop(&mut self) {
        self.registry.remove(&self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::core::dispatch::Dispatcher;
    use frank_proto::RPL_TOPIC;

    fn topic_matcher(channel: &'static str) -> impl Fn(&Message) -> Option<String> + Send + Sync {
        move |msg: &Message| {
            (msg.command == RPL_TOPIC && msg.param(1) == Some(channel))
                .then(|| msg.text().to_string())
        }
    }

    #[tokio::test]
    async fn test_match_delivers_and_removes() {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Duration::from_secs(1));

        let pending = Correlation::register(&registry, "topic getter", topic_matcher("#test"));
        assert_eq!(registry.len(), 1);

        let unrelated: Message = ":s 332 frank #other :nope".parse().unwrap();
        dispatcher.run(unrelated).await;
        assert_eq!(registry.len(), 1);

        let reply: Message = ":s 332 frank #test :the topic".parse().unwrap();
        dispatcher.run(reply).await;
        // removed by the dispatcher on match
        assert!(registry.is_empty());

        let topic = pending.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(topic, "the topic");
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_listener() {
        let registry = Arc::new(Registry::new());
        let pending = Correlation::register(&registry, "topic getter", topic_matcher("#test"));
        let handle = pending.handle();

        let err = pending.wait(Duration::from_secs(60)).await.unwrap_err();
        assert!(matches!(err, CorrelationError::TimedOut { .. }));
        assert!(!registry.contains(&handle));
        assert!(!registry.remove(&handle));
    }

    #[tokio::test]
    async fn test_drop_removes_listener() {
        let registry = Arc::new(Registry::new());
        {
            let _pending =
                Correlation::register(&registry, "topic getter", topic_matcher("#test"));
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_double_match_answers_once() {
        let registry = Arc::new(Registry::new());
        let pending = Correlation::register(&registry, "topic getter", topic_matcher("#test"));

        // Run the listener directly twice, as two overlapping dispatches would.
        let listener = registry.snapshot().remove(0);
        let reply: Message = ":s 332 frank #test :first".parse().unwrap();
        let again: Message = ":s 332 frank #test :second".parse().unwrap();
        assert_eq!(listener.handler().handle(&reply).await.unwrap(), Flow::Remove);
        assert_eq!(listener.handler().handle(&again).await.unwrap(), Flow::Remove);

        assert_eq!(pending.wait(Duration::from_secs(1)).await.unwrap(), "first");
    }
}
