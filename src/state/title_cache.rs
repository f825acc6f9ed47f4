//! Fixed-capacity ring of recently posted link titles.
//!
//! Eviction is pure FIFO by insertion: every `add` takes the next slot,
//! regardless of whether the entry living there is still valid. Expired
//! entries are never purged, only skipped on read.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    title: String,
    stored_at: Instant,
}

#[derive(Debug)]
struct Ring {
    slots: Vec<Option<Entry>>,
    next: usize,
}

/// A title found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTitle {
    pub url: String,
    pub title: String,
    /// Time since the entry was stored.
    pub age: Duration,
}

/// Ring buffer of `(url, title, timestamp)` records.
#[derive(Debug)]
pub struct TitleCache {
    ttl: Duration,
    ring: Mutex<Ring>,
}

impl TitleCache {
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            ttl,
            ring: Mutex::new(Ring {
                slots: vec![None; capacity],
                next: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }

    /// Number of occupied slots, expired ones included.
    pub fn len(&self) -> usize {
        self.ring.lock().slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a title, overwriting the oldest slot once the ring is full.
    pub fn add(&self, url: impl Into<String>, title: impl Into<String>) {
        let entry = Entry {
            url: url.into(),
            title: title.into(),
            stored_at: Instant::now(),
        };

        // Cursor advance and slot write happen under one lock.
        let mut ring = self.ring.lock();
        let idx = ring.next;
        ring.slots[idx] = Some(entry);
        ring.next = (idx + 1) % ring.slots.len();
    }

    /// Youngest valid entry for `url`.
    pub fn get_by_url(&self, url: &str) -> Option<CachedTitle> {
        let now = Instant::now();
        let ring = self.ring.lock();
        ring.slots
            .iter()
            .flatten()
            .filter(|e| e.url == url)
            .map(|e| (e, now.saturating_duration_since(e.stored_at)))
            .filter(|(_, age)| *age <= self.ttl)
            .min_by_key(|(_, age)| *age)
            .map(|(e, age)| CachedTitle {
                url: e.url.clone(),
                title: e.title.clone(),
                age,
            })
    }

    /// Time since `title` was last stored, or `Duration::MAX` if never.
    ///
    /// Looks at every occupied slot, TTL is not applied.
    pub fn since_last_post_of_title(&self, title: &str) -> Duration {
        let now = Instant::now();
        let ring = self.ring.lock();
        ring.slots
            .iter()
            .flatten()
            .filter(|e| e.title == title)
            .map(|e| now.saturating_duration_since(e.stored_at))
            .min()
            .unwrap_or(Duration::MAX)
    }
}
