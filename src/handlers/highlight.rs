//! `high` / `highpub`: delayed highlight for testing IRC clients.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

lazy_static! {
    static ref CUSTOM_TEXT: Regex = Regex::new(r"^(?:high|highpub)\s+(.{1,70})").unwrap();
}

/// A parsed highlight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub text: String,
    pub public: bool,
}

impl HighlightRequest {
    /// Parse `high [text]` / `highpub [text]`. `nick` is the default text.
    pub fn parse(line: &str, nick: &str) -> Option<Self> {
        if !line.starts_with("high") {
            return None;
        }
        let text = CUSTOM_TEXT
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map_or(nick, |m| m.as_str());
        Some(Self {
            text: text.to_string(),
            public: line.starts_with("highpub"),
        })
    }
}

pub struct HighlightListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    delay: Duration,
    public_channel: String,
}

impl HighlightListener {
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        delay: Duration,
        public_channel: String,
    ) -> Self {
        Self {
            identity,
            outbox,
            delay,
            public_channel,
        }
    }
}

#[async_trait]
impl Handler for HighlightListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !self.identity.is_private_query(msg) {
            return Ok(Flow::Continue);
        }
        let Some(nick) = msg.nick() else {
            return Ok(Flow::Continue);
        };
        let Some(request) = HighlightRequest::parse(msg.text(), nick) else {
            return Ok(Flow::Continue);
        };
        info!(nick = %nick, public = request.public, "Highlight requested");

        let (target, line) = if request.public {
            (
                self.public_channel.clone(),
                format!("highlight test: {}", request.text),
            )
        } else {
            (nick.to_string(), request.text)
        };
        let outbox = self.outbox.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            outbox.privmsg(&target, &line);
        });
        Ok(Flow::Continue)
    }
}
