//! Private `help` answers.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use frank_proto::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Minimum time between two help texts for the same nick.
const HELP_COOLDOWN: Duration = Duration::from_secs(60);

pub struct HelpListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    last_helps: DashMap<String, Instant>,
}

impl HelpListener {
    pub fn new(identity: Arc<Identity>, outbox: Outbox) -> Self {
        Self {
            identity,
            outbox,
            last_helps: DashMap::new(),
        }
    }

    /// The help text, one line per message.
    pub fn help_text(bot: &str) -> Vec<String> {
        vec![
            "1. Test your IRC client’s highlighting:".to_string(),
            format!("  – /msg {bot} high"),
            format!("  – /msg {bot} high custom_text"),
            format!("  – /msg {bot} highpub custom_text"),
            "“high” sends you a private message, “highpub” posts to #test.".to_string(),
            "Your nick will be used unless custom_text is defined. Delay is always 5 seconds."
                .to_string(),
            " ".to_string(),
            "2. I won’t spoiler URLs if you add “no spoiler” to your message".to_string(),
            " ".to_string(),
            "3. There’s a karma system. You can’t vote on yourself.".to_string(),
            "  – thing++ # optional comment".to_string(),
            "  – thing-- # thing may be alphanumerical, Unicode is supported".to_string(),
            "  – karma for thing  //  karma thing  //  karma thing?".to_string(),
            " ".to_string(),
            "4. I’ll answer to !raum in certain channels.".to_string(),
            " ".to_string(),
            "If you need more details, please look at my source:".to_string(),
            "https://github.com/breunigs/frank".to_string(),
        ]
    }

    /// Record a help request; false while the nick is still cooling down.
    fn allow(&self, nick: &str) -> bool {
        let now = Instant::now();
        match self.last_helps.entry(nick.to_string()) {
            Entry::Occupied(mut last) => {
                if now.duration_since(*last.get()) <= HELP_COOLDOWN {
                    return false;
                }
                last.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        true
    }
}

#[async_trait]
impl Handler for HelpListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !self.identity.is_private_query(msg) {
            return Ok(Flow::Continue);
        }
        let content = msg.text().to_lowercase();
        if content != "help" && content != "!help" {
            return Ok(Flow::Continue);
        }
        let Some(nick) = msg.nick() else {
            return Ok(Flow::Continue);
        };

        if !self.allow(nick) {
            warn!(nick = %nick, "Help requested too often, not answering");
            return Ok(Flow::Continue);
        }

        info!(nick = %nick, "Sending help");
        for line in Self::help_text(&self.identity.nick()) {
            self.outbox.privmsg(nick, &line);
        }
        Ok(Flow::Continue)
    }
}
