//! `lmgtfy <query>` answers with the page Google's "I'm feeling lucky"
//! search redirects to.
//!
//! The lucky search answers with a chain of redirects. Only hops that stay on
//! Google are followed; the first one leaving it carries the result.

use super::core::{Flow, Handler, HandlerResult};
use crate::error::FetchError;
use crate::fetch::{TitleFetcher, USER_AGENT, read_limited};
use crate::network::Outbox;
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const GOOGLE_SEARCH: &str = "https://www.google.com/search";
/// Redirects are followed while the host contains this.
pub const GOOGLE_HOSTS: &str = ".google.";

/// Body bytes quoted when the search does not redirect.
const BODY_EXCERPT: usize = 200;
const MAX_REDIRECTS: usize = 10;

lazy_static! {
    /// `lmgtfy query`, `lmgtfy: query`, optionally addressed as `nick: lmgtfy query`.
    static ref LMGTFY: Regex = Regex::new(r"^(?:[\d\pL._-]+: )?lmgtfy:? (.+)").unwrap();
}

/// The search query of an lmgtfy request.
pub fn lmgtfy_query(text: &str) -> Option<&str> {
    LMGTFY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// HTTP client that follows redirects only while they stay on hosts
/// containing `stay_on`.
pub fn lucky_client(timeout: Duration, stay_on: &str) -> Result<reqwest::Client, reqwest::Error> {
    let stay_on = stay_on.to_string();
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt
                .url()
                .host_str()
                .is_some_and(|host| host.contains(stay_on.as_str()))
            {
                attempt.follow()
            } else {
                attempt.stop()
            }
        }))
        .build()
}

/// Runs lucky searches and describes their results.
pub struct LuckySearch {
    client: reqwest::Client,
    search_url: String,
    fetcher: Arc<dyn TitleFetcher>,
}

impl LuckySearch {
    /// `client` should come from [`lucky_client`].
    pub fn new(
        client: reqwest::Client,
        search_url: impl Into<String>,
        fetcher: Arc<dyn TitleFetcher>,
    ) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            fetcher,
        }
    }

    /// Where the lucky search for `query` leads.
    pub async fn lucky(&self, query: &str) -> Result<Url, FetchError> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("btnI", "1"), ("q", query)])
            .send()
            .await?;
        let url = response.url().clone();

        if response.status() != StatusCode::FOUND {
            let got = response.status().as_u16();
            let body = read_limited(response, BODY_EXCERPT).await?;
            return Err(FetchError::NotRedirected {
                url: url.to_string(),
                got,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| url.join(location).ok())
            .ok_or_else(|| FetchError::NoLocation(url.to_string()))
    }

    /// `title @ url` for the result, or the bare URL when it has no title.
    pub async fn reply_for(&self, query: &str) -> Result<String, FetchError> {
        let result = self.lucky(query).await?.to_string();
        match self.fetcher.fetch_title(&result).await {
            Ok(fetched) if !fetched.title.is_empty() => Ok(format!("{} @ {result}", fetched.title)),
            Ok(_) => Ok(result),
            Err(e) => {
                debug!(url = %result, error = %e, "No title for lucky result");
                Ok(result)
            }
        }
    }
}

/// Answers `lmgtfy` requests in channels.
pub struct LmgtfyListener {
    outbox: Outbox,
    search: Arc<LuckySearch>,
}

impl LmgtfyListener {
    pub fn new(outbox: Outbox, search: Arc<LuckySearch>) -> Self {
        Self { outbox, search }
    }
}

#[async_trait]
impl Handler for LmgtfyListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !msg.is("PRIVMSG") {
            return Ok(Flow::Continue);
        }
        let Some(channel) = msg.target().filter(|t| t.starts_with('#')) else {
            return Ok(Flow::Continue);
        };
        let Some(query) = lmgtfy_query(msg.text()) else {
            return Ok(Flow::Continue);
        };

        info!(channel = %channel, query = %query, "Googling");
        let search = Arc::clone(&self.search);
        let outbox = self.outbox.clone();
        let channel = channel.to_string();
        let query = query.to_string();
        tokio::spawn(async move {
            match search.reply_for(&query).await {
                Ok(reply) => outbox.privmsg(&channel, &format!("[LMGTFY] {reply}")),
                Err(e) => {
                    warn!(query = %query, error = %e, "Lucky search failed");
                    outbox.privmsg(&channel, &format!("Error: googling {query:?} failed: {e}"));
                }
            }
        });
        Ok(Flow::Continue)
    }
}
