//! Keeps the next event in the channel topic.
//!
//! The topic is split on `|`. The segment carrying the marker belongs to the
//! bot and is replaced with the next event; every other segment is left
//! alone. The current topic is read back from the server through a
//! [`Correlation`] on the TOPIC reply.

use super::core::{Correlation, Registry};
use crate::db::{Event, EventSource};
use crate::error::{CorrelationError, TopicError};
use crate::network::Outbox;
use chrono::{Local, NaiveDate};
use frank_proto::{Message, RPL_NOTOPIC, RPL_TOPIC};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const SEPARATOR: &str = "|";

/// Marks the bot's topic segment.
pub const MARKER: &str = "ꜰ";

const YARPNARP: &str = "https://www.noname-ev.de/yarpnarp.html";

/// Failures are reported to the channel at most this often.
const FAILURE_REPORT_INTERVAL: Duration = Duration::from_secs(3600);

/// Describe `event` in one line, relative to `today`.
pub fn format_event(event: &Event, today: NaiveDate) -> String {
    let when = if event.date == today {
        format!("HEUTE ({})", event.date.format("%d.%b"))
    } else if today.succ_opt() == Some(event.date) {
        format!("MORGEN ({})", event.date.format("%d.%b"))
    } else {
        event.date.format("%Y-%m-%d").to_string()
    };

    let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    let what = if let Some(text) = non_empty(&event.override_text) {
        format!("Ausnahmsweise: {text}")
    } else if event.stammtisch {
        let location = non_empty(&event.location).unwrap_or_else(|| "TBA".to_string());
        format!("Stammtisch @ {location} {YARPNARP} bitte zu/absagen")
    } else {
        let topic = non_empty(&event.topic).unwrap_or_else(|| "noch keine ◉︵◉".to_string());
        format!("c¼h: {topic}")
    };

    format!("{when}: {what}").trim().to_string()
}

/// Replace the marked segment of `topic` with `event_line`, or append one.
pub fn insert_next_event(topic: &str, event_line: &str) -> String {
    let segment = format!(" {MARKER} {event_line} ");
    if topic.trim().is_empty() {
        return segment.trim().to_string();
    }

    let padded = format!(" {topic} ");
    let mut parts: Vec<&str> = padded.split(SEPARATOR).collect();
    match parts.iter().position(|part| part.contains(MARKER)) {
        Some(idx) => parts[idx] = &segment,
        None => parts.push(&segment),
    }
    parts.join(SEPARATOR).trim().to_string()
}

pub struct TopicChanger {
    registry: Arc<Registry>,
    outbox: Outbox,
    events: Arc<dyn EventSource>,
    query_timeout: Duration,
    last_failure_report: Mutex<Option<Instant>>,
}

impl TopicChanger {
    pub fn new(
        registry: Arc<Registry>,
        outbox: Outbox,
        events: Arc<dyn EventSource>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            outbox,
            events,
            query_timeout,
            last_failure_report: Mutex::new(None),
        }
    }

    /// Ask the server for the topic of `channel`. No topic reads as empty.
    pub async fn current_topic(&self, channel: &str) -> Result<String, CorrelationError> {
        let wanted = channel.to_string();
        let reply = Correlation::register(
            &self.registry,
            format!("topic query {channel}"),
            move |msg: &Message| {
                let is_reply = msg.command == RPL_TOPIC || msg.command == RPL_NOTOPIC;
                (is_reply && msg.param(1).is_some_and(|c| c.eq_ignore_ascii_case(&wanted)))
                    .then(|| {
                        if msg.command == RPL_TOPIC {
                            msg.text().to_string()
                        } else {
                            String::new()
                        }
                    })
            },
        );
        self.outbox.send(Message::topic_query(channel));
        reply.wait(self.query_timeout).await
    }

    /// Bring the topic of `channel` up to date. Returns whether it changed.
    pub async fn update(&self, channel: &str, today: NaiveDate) -> Result<bool, TopicError> {
        let topic = self.current_topic(channel).await?;
        let event = self.events.next_event(today).await?;
        let new_topic = insert_next_event(&topic, &format_event(&event, today));

        if new_topic == topic {
            debug!(channel = %channel, "Topic already current");
            return Ok(false);
        }
        info!(channel = %channel, old = %topic, new = %new_topic, "Updating topic");
        self.outbox.topic(channel, &new_topic);
        Ok(true)
    }

    /// Update `channel` now, logging failures. Event lookup failures are
    /// also reported to the channel, at most once an hour.
    pub async fn set_topic(&self, channel: &str) {
        let today = Local::now().date_naive();
        match self.update(channel, today).await {
            Ok(_) => {}
            Err(TopicError::Query(e)) => {
                warn!(channel = %channel, error = %e, "Cannot update topic");
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, "Topic changer failed");
                if self.claim_failure_report() {
                    self.outbox
                        .privmsg(channel, &format!("failed to retrieve topic: {e}"));
                }
            }
        }
    }

    fn claim_failure_report(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_failure_report.lock();
        if last.is_some_and(|prev| now.duration_since(prev) < FAILURE_REPORT_INTERVAL) {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Update every channel now and then every `period` until shutdown.
    pub async fn run(
        self: Arc<Self>,
        channels: Vec<String>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(channels = ?channels, ?period, "Topic changer started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for channel in &channels {
                        self.set_topic(channel).await;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Topic changer stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use crate::handlers::core::Dispatcher;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn talk() -> Event {
        Event {
            stammtisch: false,
            override_text: None,
            location: Some("garbage".into()),
            date: day("2014-04-23"),
            topic: Some("Testing".into()),
        }
    }

    #[test]
    fn test_format_event() {
        let today = day("2014-04-16");
        assert_eq!(format_event(&talk(), today), "2014-04-23: c¼h: Testing");

        let stammtisch = Event {
            stammtisch: true,
            location: Some("Mr. Woot".into()),
            ..talk()
        };
        assert_eq!(
            format_event(&stammtisch, today),
            "2014-04-23: Stammtisch @ Mr. Woot https://www.noname-ev.de/yarpnarp.html bitte zu/absagen"
        );

        let special = Event {
            override_text: Some("RGB2R".into()),
            ..talk()
        };
        assert_eq!(
            format_event(&special, day("2014-04-23")),
            "HEUTE (23.Apr): Ausnahmsweise: RGB2R"
        );

        let untitled = Event { topic: None, ..talk() };
        assert_eq!(
            format_event(&untitled, day("2014-04-22")),
            "MORGEN (23.Apr): c¼h: noch keine ◉︵◉"
        );

        let no_location = Event {
            stammtisch: true,
            location: None,
            ..talk()
        };
        assert!(format_event(&no_location, today).contains("Stammtisch @ TBA "));
    }

    #[test]
    fn test_insert_next_event() {
        let line = "2014-04-23: c¼h: Testing";
        let expected = format!("NoName | {MARKER} {line}");

        assert_eq!(insert_next_event("NoName", line), expected);
        assert_eq!(insert_next_event(&format!("NoName | {MARKER} Derp"), line), expected);
        assert_eq!(
            insert_next_event(&format!("NoName | {MARKER} Derp | Derp"), line),
            format!("{expected} | Derp")
        );
        assert_eq!(insert_next_event("", line), format!("{MARKER} {line}"));
    }

    struct FixedEvents(Option<Event>);

    #[async_trait]
    impl EventSource for FixedEvents {
        async fn next_event(&self, _today: NaiveDate) -> Result<Event, EventError> {
            self.0.clone().ok_or(EventError::NoUpcomingEvent)
        }
    }

    /// Answer TOPIC queries with `topic` and forward every other line.
    fn fake_server(
        registry: Arc<Registry>,
        mut outbound: mpsc::UnboundedReceiver<String>,
        topic: &'static str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(registry, Duration::from_secs(5));
        tokio::spawn(async move {
            while let Some(line) = outbound.recv().await {
                if let Some(channel) = line.strip_prefix("TOPIC ").filter(|r| !r.contains(':')) {
                    let reply = format!(":irc.test 332 frank {channel} :{topic}");
                    dispatcher.run(reply.parse().unwrap()).await;
                } else if tx.send(line).is_err() {
                    break;
                }
            }
        });
        rx
    }

    #[tokio::test]
    async fn test_update_sets_changed_topic_only() {
        let registry = Arc::new(Registry::new());
        let (outbox, rx) = Outbox::new();
        let mut lines = fake_server(Arc::clone(&registry), rx, "NoName | ꜰ Derp");
        let changer = TopicChanger::new(
            Arc::clone(&registry),
            outbox,
            Arc::new(FixedEvents(Some(talk()))),
            Duration::from_secs(5),
        );

        assert!(changer.update("#test", day("2014-04-16")).await.unwrap());
        assert_eq!(
            lines.recv().await.unwrap(),
            "TOPIC #test :NoName | ꜰ 2014-04-23: c¼h: Testing"
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_topic_is_left_alone() {
        let registry = Arc::new(Registry::new());
        let (outbox, rx) = Outbox::new();
        let mut lines = fake_server(
            Arc::clone(&registry),
            rx,
            "NoName | ꜰ 2014-04-23: c¼h: Testing",
        );
        let changer = TopicChanger::new(
            registry,
            outbox,
            Arc::new(FixedEvents(Some(talk()))),
            Duration::from_secs(5),
        );

        assert!(!changer.update("#test", day("2014-04-16")).await.unwrap());
        assert!(lines.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_topic_query_times_out() {
        let registry = Arc::new(Registry::new());
        let (outbox, _rx) = Outbox::new();
        let changer = TopicChanger::new(
            Arc::clone(&registry),
            outbox,
            Arc::new(FixedEvents(Some(talk()))),
            Duration::from_secs(60),
        );

        let err = changer.update("#test", day("2014-04-16")).await.unwrap_err();
        assert!(matches!(err, TopicError::Query(CorrelationError::TimedOut { .. })));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_event_failures_reported_once_an_hour() {
        let registry = Arc::new(Registry::new());
        let (outbox, rx) = Outbox::new();
        let mut lines = fake_server(Arc::clone(&registry), rx, "NoName");
        let changer = TopicChanger::new(
            registry,
            outbox,
            Arc::new(FixedEvents(None)),
            Duration::from_secs(5),
        );

        changer.set_topic("#test").await;
        assert_eq!(
            lines.recv().await.unwrap(),
            "PRIVMSG #test :failed to retrieve topic: no upcoming event"
        );

        changer.set_topic("#test").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(lines.try_recv().is_err());
    }
}
