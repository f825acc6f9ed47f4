//! SQLite-backed [`EventSource`].

use super::{Event, EventSource};
use crate::error::EventError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reads events from the `termine` and `vortraege` tables.
#[derive(Clone)]
pub struct SqliteEventSource {
    pool: SqlitePool,
}

impl SqliteEventSource {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open the database at `path`, read-only. `:memory:` opens a private
    /// writable in-memory database.
    pub async fn connect(path: &str) -> Result<Self, EventError> {
        let pool = if path == ":memory:" {
            // Each call gets its own shared-cache database so parallel tests
            // don't see each other's tables.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:frank-events-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?
        } else {
            let options = SqliteConnectOptions::new().filename(path).read_only(true);
            SqlitePoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Event database connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EventSource for SqliteEventSource {
    async fn next_event(&self, today: NaiveDate) -> Result<Event, EventError> {
        let row = sqlx::query_as::<
            _,
            (
                bool,
                Option<String>,
                Option<String>,
                String,
                Option<String>,
            ),
        >(
            r#"
            SELECT termine.stammtisch, termine.override, termine.location,
                   termine.date, vortraege.topic
            FROM termine
            LEFT JOIN vortraege ON termine.date = vortraege.date
            WHERE termine.date >= ?
            ORDER BY termine.date ASC
            LIMIT 1
            "#,
        )
        .bind(today.format("%Y-%m-%d").to_string())
        .fetch_optional(&self.pool)
        .await?;

        let (stammtisch, override_text, location, date, topic) =
            row.ok_or(EventError::NoUpcomingEvent)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| EventError::InvalidDate(date.clone()))?;

        Ok(Event {
            stammtisch,
            override_text,
            location,
            date,
            topic,
        })
    }
}
