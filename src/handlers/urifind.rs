//! Posts the titles of links mentioned in chat.
//!
//! Each uncached URL is fetched in its own task, so one slow site does not
//! hold back the others or the dispatcher. Titles go through the shared
//! [`TitleCache`], which also suppresses reposting the same title within a
//! short window.

use super::core::{Flow, Handler, HandlerResult};
use crate::fetch::{TitleFetcher, clean};
use crate::network::Outbox;
use crate::state::{Identity, TitleCache};
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

lazy_static! {
    static ref NO_SPOILER: Regex = Regex::new(r"(?i)(don't|no|kein|nicht) *spoiler").unwrap();
}

/// Extract http(s) URLs from a line of chat.
///
/// A comma followed by a space ends a URL (some sites use commas in paths).
/// A closing parenthesis is kept when it is doubled, and dropped when the URL
/// was opened by a parenthesis. Whitespace always ends a URL.
pub fn extract_urls(text: &str) -> Vec<&str> {
    let mut urls = Vec::new();
    let mut msg = text;

    while let Some(idx) = msg.find("http") {
        let mut url = &msg[idx..];
        if !url.starts_with("http://") && !url.starts_with("https://") {
            msg = &msg[idx + "http".len()..];
            continue;
        }

        if let Some(end) = url.find(", ") {
            url = &url[..end];
        }

        if let Some(paren) = url.find(')') {
            let after = idx + paren + 1;
            if msg.as_bytes().get(after) == Some(&b')') {
                url = &url[..=paren];
            } else if idx > 0 && msg.as_bytes()[idx - 1] == b'(' {
                url = &url[..paren];
            }
        }

        if let Some(end) = url.find([' ', '\t']) {
            url = &url[..end];
        }

        urls.push(url);
        msg = &msg[idx + url.len()..];
    }
    urls
}

/// `5m` below an hour, rounded hours above.
pub fn format_age(age: Duration) -> String {
    let minutes = age.as_secs() / 60;
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h", (age.as_secs() + 1800) / 3600)
    }
}

struct Inner {
    identity: Arc<Identity>,
    outbox: Outbox,
    cache: Arc<TitleCache>,
    fetcher: Arc<dyn TitleFetcher>,
    ignore: Option<Regex>,
    pointless: HashSet<String>,
    no_repost: Duration,
    fetch_timeout: Duration,
}

impl Inner {
    /// Post `[prefix] title` unless the same title went out moments ago.
    fn post_title(&self, msg: &Message, title: &str, prefix: Option<&str>) {
        let since = self.cache.since_last_post_of_title(title);
        if since <= self.no_repost {
            debug!(title = %title, ?since, "Skipping repost");
            return;
        }
        let Some(target) = self.identity.reply_target(msg) else {
            return;
        };

        let prefix = prefix.map_or_else(|| "Link Info".to_string(), clean);
        self.outbox
            .privmsg(target, &format!("[{prefix}] {}", clean(title)));
    }

    async fn fetch_and_post(&self, msg: &Message, url: &str) {
        if self.ignore.as_ref().is_some_and(|re| re.is_match(url)) {
            debug!(url = %url, "Ignoring URL");
            return;
        }

        info!(url = %url, "Fetching title");
        let fetched =
            match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_title(url)).await {
                Ok(Ok(fetched)) => fetched,
                Ok(Err(e)) => {
                    warn!(url = %url, error = %e, "Title fetch failed");
                    return;
                }
                Err(_) => {
                    warn!(url = %url, "Title fetch timed out");
                    return;
                }
            };

        if self.pointless.contains(&fetched.title) {
            debug!(url = %url, title = %fetched.title, "Pointless title");
            return;
        }
        self.post_title(msg, &fetched.title, None);
        self.cache.add(url, fetched.title);
    }
}

/// Link title listener.
pub struct UrlListener {
    inner: Arc<Inner>,
}

impl UrlListener {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        cache: Arc<TitleCache>,
        fetcher: Arc<dyn TitleFetcher>,
        ignore: Option<Regex>,
        pointless: impl IntoIterator<Item = String>,
        no_repost: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity,
                outbox,
                cache,
                fetcher,
                ignore,
                pointless: pointless.into_iter().collect(),
                no_repost,
                fetch_timeout,
            }),
        }
    }
}

#[async_trait]
impl Handler for UrlListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !msg.is("PRIVMSG") {
            return Ok(Flow::Continue);
        }
        let text = msg.text();
        if NO_SPOILER.is_match(text) {
            debug!("Not spoilering this line");
            return Ok(Flow::Continue);
        }

        let mut shared: Option<Arc<Message>> = None;
        for url in extract_urls(text).into_iter().filter(|u| !u.is_empty()) {
            if let Some(hit) = self.inner.cache.get_by_url(url) {
                debug!(url = %url, "Using cached title");
                let prefix = format!("cached {} ago", format_age(hit.age));
                self.inner.post_title(msg, &hit.title, Some(&prefix));
                // Re-add under an empty URL so the repost check sees this post.
                self.inner.cache.add("", hit.title);
                continue;
            }

            let inner = Arc::clone(&self.inner);
            let msg = Arc::clone(shared.get_or_insert_with(|| Arc::new(msg.clone())));
            let url = url.to_string();
            tokio::spawn(async move { inner.fetch_and_post(&msg, &url).await });
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::FetchedTitle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[test]
    fn test_extract_urls() {
        let cases: &[(&str, &[&str])] = &[
            (
                "Ich finde http://github.com/lol toll, aber http://heise.de besser",
                &["http://github.com/lol", "http://heise.de"],
            ),
            ("dort (http://deinemudda.de) gibts geile pics", &["http://deinemudda.de"]),
            ("http://heise.de, letztens gefunden.", &["http://heise.de"]),
            ("http-rfc ist doof", &[]),
            ("http://http://foo.de, letztens gefunden.", &["http://http://foo.de"]),
            ("http://http://foo.de letztens gefunden", &["http://http://foo.de"]),
            (
                "failed auf https://maps.google.de/maps?q=Frankfurt+(Oder)&hl=de ?",
                &["https://maps.google.de/maps?q=Frankfurt+(Oder)&hl=de"],
            ),
            (
                "(nested parens http://en.wikipedia.org/wiki/Heuristic_(engineering))",
                &["http://en.wikipedia.org/wiki/Heuristic_(engineering)"],
            ),
            (
                "enclosed by parens: (http://en.wikipedia.org/wiki/Heuristic_(engineering))",
                &["http://en.wikipedia.org/wiki/Heuristic_(engineering)"],
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(extract_urls(input), *expected, "{input}");
        }
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(5 * 60 + 59)), "5m");
        assert_eq!(format_age(Duration::from_secs(59 * 60)), "59m");
        assert_eq!(format_age(Duration::from_secs(60 * 60)), "1h");
        assert_eq!(format_age(Duration::from_secs(150 * 60)), "3h");
    }

    struct FixedTitle {
        title: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TitleFetcher for FixedTitle {
        async fn fetch_title(&self, url: &str) -> Result<FetchedTitle, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedTitle {
                title: self.title.to_string(),
                final_url: url.to_string(),
            })
        }
    }

    fn setup(
        title: &'static str,
    ) -> (UrlListener, Arc<TitleCache>, Arc<FixedTitle>, mpsc::UnboundedReceiver<String>) {
        let (outbox, rx) = Outbox::new();
        let cache = Arc::new(TitleCache::new(10, Duration::from_secs(3600)));
        let fetcher = Arc::new(FixedTitle {
            title,
            calls: AtomicUsize::new(0),
        });
        let listener = UrlListener::new(
            Arc::new(Identity::new("frank", vec![])),
            outbox,
            Arc::clone(&cache),
            fetcher.clone(),
            Some(Regex::new(r"^http://p\.nnev\.de").unwrap()),
            vec!["".to_string(), "Google".to_string()],
            Duration::from_secs(30),
            Duration::from_secs(10),
        );
        (listener, cache, fetcher, rx)
    }

    async fn next_line(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetches_posts_and_caches() {
        let (listener, cache, _fetcher, mut rx) = setup("Example  Domain");
        let msg: Message = ":carol!c@h PRIVMSG #test :see https://example.org"
            .parse()
            .unwrap();

        listener.handle(&msg).await.unwrap();
        assert_eq!(next_line(&mut rx).await, "PRIVMSG #test :[Link Info] Example Domain");
        assert!(cache.get_by_url("https://example.org").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_title_and_repost_window() {
        let (listener, cache, fetcher, mut rx) = setup("unused");
        cache.add("https://example.org", "Example");
        tokio::time::advance(Duration::from_secs(5 * 60)).await;

        let msg: Message = ":carol!c@h PRIVMSG frank :https://example.org"
            .parse()
            .unwrap();
        listener.handle(&msg).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "PRIVMSG carol :[cached 5m ago] Example");

        // same link again right away: suppressed as a repost
        listener.handle(&msg).await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_spoiler_ignored_and_pointless_titles() {
        let (listener, _cache, fetcher, mut rx) = setup("Google");
        let quiet: Message = ":carol!c@h PRIVMSG #test :no spoiler https://example.org"
            .parse()
            .unwrap();
        listener.handle(&quiet).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        let ignored: Message = ":carol!c@h PRIVMSG #test :http://p.nnev.de/123"
            .parse()
            .unwrap();
        listener.handle(&ignored).await.unwrap();

        let pointless: Message = ":carol!c@h PRIVMSG #test :https://google.com"
            .parse()
            .unwrap();
        listener.handle(&pointless).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }
}
