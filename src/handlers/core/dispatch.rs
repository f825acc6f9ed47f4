//! Concurrent dispatch of one message to every listener.
//!
//! Each listener runs in its own task. The dispatcher waits for all of them
//! up to a shared deadline and reports which ones failed. A failing, panicking
//! or stuck listener never holds back its siblings: panics are caught at the
//! task boundary, and a listener still running at the deadline is reported
//! as timed out and left to finish in the background.

use super::registry::{Listener, Registry};
use super::traits::Flow;
use crate::error::{DispatchError, FailureKind, HandlerFailure};
use crate::telemetry::{ListenerTimer, spans};
use frank_proto::Message;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, warn};

/// Outcome of one dispatch round.
#[derive(Debug)]
pub struct DispatchReport {
    pub command: String,
    /// Number of listeners the message was handed to.
    pub invoked: usize,
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure plus a count, or `Ok` if every listener succeeded.
    pub fn into_result(self) -> Result<(), DispatchError> {
        let total = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(DispatchError {
                command: self.command,
                first,
                total,
            }),
        }
    }
}

/// Runs messages against a [`Registry`] snapshot.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    handler_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, handler_timeout: Duration) -> Self {
        Self {
            registry,
            handler_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Hand `msg` to every registered listener concurrently.
    pub async fn run(&self, msg: Message) -> DispatchReport {
        let msg = Arc::new(msg);
        let span = spans::dispatch(&msg.command, msg.nick());

        async {
            let listeners = self.registry.snapshot();
            let invoked = listeners.len();
            let deadline = Instant::now() + self.handler_timeout;

            let pending: Vec<_> = listeners
                .into_iter()
                .map(|listener| {
                    let task = tokio::spawn(
                        invoke(
                            Arc::clone(&listener),
                            Arc::clone(&msg),
                            Arc::clone(&self.registry),
                        )
                        .instrument(spans::listener(listener.description())),
                    );
                    (listener, task)
                })
                .collect();

            let mut failures = Vec::new();
            for (listener, task) in pending {
                let kind = match tokio::time::timeout_at(deadline, task).await {
                    Ok(Ok(Ok(()))) => continue,
                    Ok(Ok(Err(e))) => {
                        warn!(
                            listener = %listener.description(),
                            code = e.error_code(),
                            error = %e,
                            message = %msg,
                            "Listener failed"
                        );
                        FailureKind::Handler(e)
                    }
                    Ok(Err(join_err)) => {
                        let kind = join_failure(join_err);
                        error!(
                            listener = %listener.description(),
                            error = %kind,
                            message = %msg,
                            "Listener crashed"
                        );
                        kind
                    }
                    // Dropping the JoinHandle detaches the task; it keeps running.
                    Err(_) => {
                        warn!(
                            listener = %listener.description(),
                            timeout = ?self.handler_timeout,
                            message = %msg,
                            "Listener still running, no longer waiting for it"
                        );
                        FailureKind::TimedOut(self.handler_timeout)
                    }
                };
                failures.push(HandlerFailure {
                    listener: listener.description().to_string(),
                    kind,
                });
            }

            debug!(invoked, failed = failures.len(), "Dispatch complete");
            DispatchReport {
                command: msg.command.clone(),
                invoked,
                failures,
            }
        }
        .instrument(span)
        .await
    }
}

/// Run one listener, honouring a request to deregister.
async fn invoke(
    listener: Arc<Listener>,
    msg: Arc<Message>,
    registry: Arc<Registry>,
) -> Result<(), crate::error::HandlerError> {
    let _timer = ListenerTimer::new(listener.description());
    match listener.handler().handle(&msg).await? {
        Flow::Continue => {}
        Flow::Remove => {
            registry.remove(&listener.handle());
        }
    }
    Ok(())
}

fn join_failure(err: JoinError) -> FailureKind {
    if err.is_panic() {
        FailureKind::Panicked(panic_message(err.into_panic()))
    } else {
        FailureKind::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
