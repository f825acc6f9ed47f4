//! Event database for the topic changer.
//!
//! The topic changer only needs the next upcoming event, so the database sits
//! behind [`EventSource`] and tests can substitute a fixed event.

mod events;

pub use events::SqliteEventSource;

use crate::error::EventError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// The next scheduled meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Regular pub meetup rather than a talk evening.
    pub stammtisch: bool,
    /// Replaces the usual description when set.
    pub override_text: Option<String>,
    pub location: Option<String>,
    pub date: NaiveDate,
    /// Talk title.
    pub topic: Option<String>,
}

/// Source of the next upcoming event.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// First event on or after `today`.
    async fn next_event(&self, today: NaiveDate) -> Result<Event, EventError>;
}
