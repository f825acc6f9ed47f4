//! Atom feed announcements.
//!
//! Each feed is polled in its own task. Only entries updated after boot and
//! within the freshness window are announced, and links posted recently (by
//! any feed) are not posted again.

use crate::config::{FeedConfig, RssSettings};
use crate::error::FeedError;
use crate::fetch::{html, read_limited};
use crate::network::Outbox;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Bytes of a feed document read at most.
const FEED_READ_LIMIT: usize = 1024 * 1024;

/// Number of posted links remembered across all feeds.
const RECENT_LINKS: usize = 50;

lazy_static! {
    static ref ENTRY: Regex = Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry\s*>").unwrap();
    static ref TITLE: Regex = Regex::new(r"(?s)<title\b[^>]*>(.*?)</title\s*>").unwrap();
    static ref LINK: Regex =
        Regex::new(r#"<link\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref UPDATED: Regex = Regex::new(r"(?s)<updated\b[^>]*>(.*?)</updated\s*>").unwrap();
    static ref AUTHOR: Regex =
        Regex::new(r"(?s)<author\b[^>]*>.*?<name\b[^>]*>(.*?)</name\s*>").unwrap();
    static ref CDATA: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
}

/// One Atom entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// First link of the entry.
    pub href: String,
    pub updated: DateTime<Utc>,
    pub author: Option<String>,
}

impl FeedEntry {
    /// `title (by author) href`
    pub fn one_liner(&self) -> String {
        match &self.author {
            Some(author) => format!("{} (by {author}) {}", self.title, self.href),
            None => format!("{} {}", self.title, self.href),
        }
    }
}

fn element_text(raw: &str) -> String {
    let unwrapped = CDATA.replace_all(raw, "$1");
    html::decode_entities(unwrapped.trim()).trim().to_string()
}

/// Pull the entries out of an Atom document, in document order.
///
/// Entries without a parsable `updated` timestamp are dropped.
pub fn parse_atom(xml: &str) -> Vec<FeedEntry> {
    ENTRY
        .captures_iter(xml)
        .filter_map(|caps| {
            let body = caps.get(1)?.as_str();
            let updated = UPDATED
                .captures(body)
                .and_then(|c| DateTime::parse_from_rfc3339(c[1].trim()).ok())?
                .with_timezone(&Utc);
            let title = TITLE
                .captures(body)
                .map(|c| element_text(&c[1]))
                .unwrap_or_default();
            let href = LINK
                .captures(body)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| html::decode_entities(m.as_str().trim()))
                .unwrap_or_default();
            let author = AUTHOR
                .captures(body)
                .map(|c| element_text(&c[1]))
                .filter(|a| !a.is_empty());
            Some(FeedEntry {
                title,
                href,
                updated,
                author,
            })
        })
        .collect()
}

/// Ring of recently posted links.
#[derive(Debug)]
pub struct RecentLinks {
    links: Vec<Option<String>>,
    next: usize,
}

impl RecentLinks {
    pub fn new(capacity: usize) -> Self {
        Self {
            links: vec![None; capacity.max(1)],
            next: 0,
        }
    }

    pub fn add(&mut self, link: impl Into<String>) {
        self.links[self.next] = Some(link.into());
        self.next = (self.next + 1) % self.links.len();
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.iter().flatten().any(|l| l == link)
    }
}

/// Polls feeds and posts their fresh entries.
pub struct FeedPoller {
    client: reqwest::Client,
    outbox: Outbox,
    settings: RssSettings,
    boot: DateTime<Utc>,
    recent: Mutex<RecentLinks>,
}

impl FeedPoller {
    pub fn new(client: reqwest::Client, outbox: Outbox, settings: RssSettings) -> Self {
        Self::with_boot_time(client, outbox, settings, Utc::now())
    }

    /// Entries updated before `boot` are never announced.
    pub fn with_boot_time(
        client: reqwest::Client,
        outbox: Outbox,
        settings: RssSettings,
        boot: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            outbox,
            settings,
            boot,
            recent: Mutex::new(RecentLinks::new(RECENT_LINKS)),
        }
    }

    fn is_fresh(&self, entry: &FeedEntry, now: DateTime<Utc>) -> bool {
        let freshness = chrono::Duration::minutes(self.settings.freshness_mins as i64);
        entry.updated >= self.boot && now - entry.updated < freshness
    }

    /// One-liners worth posting, newest first as in the feed. Their links
    /// are remembered as posted.
    pub fn postable(&self, entries: &[FeedEntry], now: DateTime<Utc>) -> Vec<String> {
        let mut recent = self.recent.lock();
        let mut lines: Vec<String> = Vec::new();
        for entry in entries {
            if !self.is_fresh(entry, now) {
                continue;
            }
            if recent.contains(&entry.href) {
                debug!(title = %entry.title, "Already posted");
                continue;
            }
            recent.add(entry.href.clone());

            let line = entry.one_liner();
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Post `lines` (newest first) for `feed`, oldest first on IRC.
    ///
    /// A single item over the limit is shown rather than replaced by a
    /// summary line.
    pub fn announce(&self, feed: &FeedConfig, mut lines: Vec<String>) {
        let max = self.settings.max_items;
        if lines.len() > max + 1 {
            self.outbox.privmsg(
                &feed.channel,
                &format!(
                    "::{}:: had {} updates, showing the latest {max}",
                    feed.name,
                    lines.len()
                ),
            );
            lines.truncate(max);
        }

        for line in lines.iter().rev() {
            info!(feed = %feed.name, line = %line, "Posting feed entry");
            self.outbox
                .privmsg(&feed.channel, &format!("::{}:: {line}", feed.name));
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = read_limited(response, FEED_READ_LIMIT).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Check `feed` once. Returns how many entries were announced.
    pub async fn poll_once(&self, feed: &FeedConfig) -> Result<usize, FeedError> {
        debug!(feed = %feed.name, "Checking feed");
        let xml = self.fetch(&feed.url).await?;
        let lines = self.postable(&parse_atom(&xml), Utc::now());
        let count = lines.len();
        self.announce(feed, lines);
        Ok(count)
    }

    /// Poll `feed` until shutdown.
    pub async fn run(self: Arc<Self>, feed: FeedConfig, mut shutdown: broadcast::Receiver<()>) {
        let check_every = Duration::from_secs(self.settings.check_every_secs);
        let retry_after = Duration::from_secs(self.settings.retry_after_secs);
        info!(feed = %feed.name, channel = %feed.channel, "Feed poller started");

        let mut wait = check_every;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.recv() => {
                    info!(feed = %feed.name, "Feed poller stopping");
                    break;
                }
            }
            wait = match self.poll_once(&feed).await {
                Ok(_) => check_every,
                Err(e) => {
                    warn!(feed = %feed.name, error = %e, "Feed check failed");
                    check_every.max(retry_after)
                }
            };
        }
    }
}
