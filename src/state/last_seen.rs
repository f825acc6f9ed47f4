//! When someone was last active in a channel.
//!
//! `channel -> nick or user@host -> timestamp`. The in-memory map is
//! authoritative; the file on disk is refreshed at most once per write
//! interval and pruned of entries older than the retention window.

use super::persistence::{load_json, save_json, write_off_worker};
use crate::error::PersistError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type SeenMap = HashMap<String, HashMap<String, DateTime<Utc>>>;

#[derive(Debug, Default)]
struct Inner {
    seen: SeenMap,
    last_flush: Option<Instant>,
}

/// Last-activity timestamps with throttled atomic persistence.
#[derive(Debug)]
pub struct LastSeenStore {
    path: Option<PathBuf>,
    retention: Duration,
    write_interval: Duration,
    inner: Mutex<Inner>,
    /// Serializes file writes so an older snapshot never lands after a newer one.
    write_lock: Mutex<()>,
}

impl LastSeenStore {
    /// A store that never touches the disk.
    pub fn in_memory(retention: Duration, write_interval: Duration) -> Self {
        Self {
            path: None,
            retention,
            write_interval,
            inner: Mutex::new(Inner::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the store from `path`. Unreadable files start an empty store.
    pub fn load(path: impl Into<PathBuf>, retention: Duration, write_interval: Duration) -> Self {
        let path = path.into();
        let seen = match load_json::<SeenMap>(&path) {
            Ok(Some(seen)) => {
                info!(path = %path.display(), channels = seen.len(), "Loaded last-seen");
                seen
            }
            Ok(None) => SeenMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read last-seen, starting empty");
                SeenMap::new()
            }
        };

        Self {
            path: Some(path),
            retention,
            write_interval,
            inner: Mutex::new(Inner {
                seen,
                last_flush: None,
            }),
            write_lock: Mutex::new(()),
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn write_interval(&self) -> Duration {
        self.write_interval
    }

    /// Record activity of `key` in `channel` now.
    ///
    /// Returns how long `key` had been absent, `None` if never seen.
    pub fn touch(&self, channel: &str, key: &str) -> Option<Duration> {
        self.touch_at(channel, key, Utc::now())
    }

    fn touch_at(&self, channel: &str, key: &str, now: DateTime<Utc>) -> Option<Duration> {
        let mut inner = self.inner.lock();
        let previous = inner
            .seen
            .entry(channel.to_string())
            .or_default()
            .insert(key.to_string(), now);
        // A clock step backwards counts as "just seen".
        previous.map(|t| (now - t).to_std().unwrap_or_default())
    }

    /// Whether `key` was seen in `channel` within the retention window.
    pub fn seen_recently(&self, channel: &str, key: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .seen
            .get(channel)
            .and_then(|c| c.get(key))
            .and_then(|t| (Utc::now() - *t).to_std().ok())
            .is_some_and(|absent| absent <= self.retention)
    }

    /// Number of remembered keys across all channels.
    pub fn len(&self) -> usize {
        self.inner.lock().seen.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries older than the retention window.
    fn collect_garbage(seen: &mut SeenMap, retention: Duration, now: DateTime<Utc>) {
        for keys in seen.values_mut() {
            keys.retain(|_, last| (now - *last).to_std().map_or(true, |age| age <= retention));
        }
        seen.retain(|_, keys| !keys.is_empty());
    }

    /// Write the store if the last write is at least one interval ago.
    ///
    /// Returns whether a write happened.
    pub fn flush_if_due(&self) -> Result<bool, PersistError> {
        {
            let inner = self.inner.lock();
            if let Some(last) = inner.last_flush
                && last.elapsed() < self.write_interval
            {
                return Ok(false);
            }
        }
        self.flush()?;
        Ok(true)
    }

    /// [`flush_if_due`](Self::flush_if_due) from async code.
    pub async fn flush_if_due_off_worker(self: &Arc<Self>) -> Result<bool, PersistError> {
        let store = Arc::clone(self);
        write_off_worker(move || store.flush_if_due()).await
    }

    /// Prune and write the store now.
    pub fn flush(&self) -> Result<(), PersistError> {
        let _writing = self.write_lock.lock();
        let snapshot = {
            let mut inner = self.inner.lock();
            Self::collect_garbage(&mut inner.seen, self.retention, Utc::now());
            inner.last_flush = Some(Instant::now());
            inner.seen.clone()
        };

        let Some(path) = &self.path else {
            return Ok(());
        };
        debug!(path = %path.display(), "Writing last-seen");
        save_json(path, &snapshot)
    }
}
