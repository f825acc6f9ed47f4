//! Links manpages mentioned as `name(section)`.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEBIAN_MANPAGES: &str = "https://manpages.debian.org";

lazy_static! {
    /// `name(1)`, `name(3pl)`, ...
    static ref MANPAGE: Regex = Regex::new(r"\b([\w-]+)\((\d[\da-z_-]*)\)(\W|$)").unwrap();
}

/// Manpage links for `text`. `<bot>: man a b` links `a/b` directly.
pub fn extract_manpages(text: &str, bot: &str, base: &str) -> Vec<String> {
    let prefix = format!("{bot}: man ");
    if let Some(rest) = text.strip_prefix(&prefix) {
        return vec![format!("{base}/{}", rest.replace(' ', "/"))];
    }

    MANPAGE
        .captures_iter(text)
        .map(|caps| format!("{base}/{}.{}", &caps[1], &caps[2]))
        .collect()
}

pub struct ManpageListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    client: reqwest::Client,
    base: String,
}

impl ManpageListener {
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        client: reqwest::Client,
        base: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            outbox,
            client,
            base: base.into(),
        }
    }
}

#[async_trait]
impl Handler for ManpageListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !msg.is("PRIVMSG") {
            return Ok(Flow::Continue);
        }
        let Some(target) = self.identity.reply_target(msg) else {
            return Ok(Flow::Continue);
        };

        for link in extract_manpages(msg.text(), &self.identity.nick(), &self.base) {
            let client = self.client.clone();
            let outbox = self.outbox.clone();
            let target = target.to_string();
            tokio::spawn(async move {
                match client.head(&link).send().await {
                    Ok(resp) if resp.status() == StatusCode::OK => {
                        outbox.privmsg(&target, &format!("[manpage] {link}"));
                    }
                    Ok(resp) => {
                        debug!(link = %link, status = %resp.status(), "Manpage not found");
                    }
                    Err(e) => warn!(link = %link, error = %e, "Manpage check failed"),
                }
            });
        }
        Ok(Flow::Continue)
    }
}
