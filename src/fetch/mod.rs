//! Link title lookup.
//!
//! [`TitleFetcher`] is the seam the URL listener talks to; [`HttpTitleFetcher`]
//! is the real implementation. HTML and PDF documents are told apart by the
//! URL's extension and handled by [`html`] and [`pdf`] respectively.

pub mod html;
mod http;
pub mod pdf;

pub use http::HttpTitleFetcher;

use crate::error::FetchError;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

/// User agent for every outgoing HTTP request.
pub const USER_AGENT: &str = "frank IRC Bot";

lazy_static! {
    /// Whitespace, NUL, format (e.g. right-to-left) and control characters.
    static ref WHITESPACE: Regex = Regex::new(r"[\s\x00\p{Cf}\p{Cc}]+").unwrap();
}

/// A fetched document title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTitle {
    /// Empty when the document has none.
    pub title: String,
    /// URL after redirects.
    pub final_url: String,
}

/// Fetches the title of the document behind a URL.
///
/// Implementations bound the time a fetch may take.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    async fn fetch_title(&self, url: &str) -> Result<FetchedTitle, FetchError>;
}

/// Collapse runs of whitespace and control characters into single spaces.
pub fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// HTTP client with the bot's user agent and a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Read at most `limit` bytes of a response body.
pub async fn read_limited(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(body)
}

/// Cut `text` to at most `max_len` bytes without splitting a character.
pub fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
