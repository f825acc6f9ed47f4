//! Telemetry utilities: subscriber setup, listener timing and spans.

use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `info` level. `format = "json"` selects
/// structured JSON output.
pub fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Listener runs slower than this are logged.
const SLOW_LISTENER: Duration = Duration::from_secs(2);

/// Guard for timing one listener invocation.
///
/// Logs a warning when dropped after a slow run.
pub struct ListenerTimer<'a> {
    listener: &'a str,
    start: Instant,
}

impl<'a> ListenerTimer<'a> {
    /// Start timing a listener.
    pub fn new(listener: &'a str) -> Self {
        Self {
            listener,
            start: Instant::now(),
        }
    }
}

impl Drop for ListenerTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if elapsed >= SLOW_LISTENER {
            tracing::warn!(listener = %self.listener, ?elapsed, "Slow listener");
        }
    }
}

/// Standardized span constructors for bot observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Span for the server connection.
    pub fn connection(server: &str, nick: &str) -> Span {
        info_span!("connection", server = %server, nick = %nick)
    }

    /// Span for one dispatch round.
    pub fn dispatch(command: &str, source: Option<&str>) -> Span {
        if let Some(source) = source {
            debug_span!("dispatch", command = %command, source = %source)
        } else {
            debug_span!("dispatch", command = %command)
        }
    }

    /// Span for one listener invocation within a dispatch.
    pub fn listener(description: &str) -> Span {
        debug_span!("listener", listener = %description)
    }
}
