//! Unified error handling for frank.
//!
//! Each concern gets its own error enum; `anyhow` is only used at the binary
//! edge in `main`.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Handler Errors (listener processing)
// ============================================================================

/// Errors a listener can return from processing one message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{command}: not enough parameters")]
    NeedMoreParams { command: String },

    #[error("malformed {command}: {reason}")]
    Malformed { command: String, reason: String },

    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),

    #[error("title fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("event lookup failed: {0}")]
    Event(#[from] EventError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams { .. } => "need_more_params",
            Self::Malformed { .. } => "malformed",
            Self::Persist(_) => "persist",
            Self::Fetch(_) => "fetch",
            Self::Event(_) => "event",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn need_more_params(command: &str) -> Self {
        Self::NeedMoreParams {
            command: command.to_string(),
        }
    }

    pub fn malformed(command: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Why one listener invocation did not complete successfully.
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("{0}")]
    Handler(#[from] HandlerError),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("still running after {0:?}")]
    TimedOut(Duration),

    #[error("task was cancelled")]
    Cancelled,
}

/// Failure of a single listener during one dispatch round.
#[derive(Debug, Error)]
#[error("listener {listener:?}: {kind}")]
pub struct HandlerFailure {
    /// Description the listener was registered with.
    pub listener: String,
    pub kind: FailureKind,
}

/// Aggregated dispatch failure: the first failing listener plus a count.
#[derive(Debug, Error)]
#[error("{command}: {first} ({total} listener(s) failed)")]
pub struct DispatchError {
    pub command: String,
    pub first: HandlerFailure,
    pub total: usize,
}

/// Errors from waiting on a correlated reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("no reply for {description:?} within {after:?}")]
    TimedOut { description: String, after: Duration },

    #[error("listener {0:?} went away before replying")]
    Closed(String),
}

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Atomic file persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rename into place failed: {0}")]
    Rename(#[from] tempfile::PersistError),

    #[error("write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Title fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("[{status}] {title}")]
    Status { status: u16, title: String },

    #[error("unexpected HTTP status code for {url:?}: got {got}, want 302. body: {body}")]
    NotRedirected { url: String, got: u16, body: String },

    #[error("redirect from {0:?} has no usable location")]
    NoLocation(String),
}

/// Topic event source errors.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no upcoming event")]
    NoUpcomingEvent,

    #[error("invalid event date: {0:?}")]
    InvalidDate(String),
}

/// Topic update errors.
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("cannot read topic: {0}")]
    Query(#[from] CorrelationError),

    #[error("{0}")]
    Event(#[from] EventError),
}

/// Why the server connection ended abnormally.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server closed the connection")]
    Closed,
}

/// Feed polling errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// Problems building the bot's collaborators at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot build http client: {0}")]
    Fetch(#[from] FetchError),

    #[error("cannot open event database: {0}")]
    Event(#[from] EventError),

    #[error("invalid url ignore pattern: {0}")]
    Pattern(#[from] regex::Error),
}
