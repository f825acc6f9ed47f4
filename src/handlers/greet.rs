//! Greets people joining a channel for the first time in a while.
//!
//! Activity is recorded under both the nick and `user@host`, so someone who
//! returns under a new nick is still recognised.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::{Identity, LastSeenStore};
use async_trait::async_trait;
use frank_proto::Message;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of recording one message's activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub nick: String,
    pub channel: String,
    /// Neither the nick nor the hostmask were seen within the retention window.
    pub is_new: bool,
    pub is_join: bool,
    /// Either key was absent longer than the write interval.
    pub flush_due: bool,
}

pub struct GreetListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    last_seen: Arc<LastSeenStore>,
    channels: Vec<String>,
    template: String,
}

impl GreetListener {
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        last_seen: Arc<LastSeenStore>,
        channels: Vec<String>,
        template: String,
    ) -> Self {
        Self {
            identity,
            outbox,
            last_seen,
            channels,
            template,
        }
    }

    /// Record the activity carried by `msg`, if it is in a greeted channel.
    pub fn observe(&self, msg: &Message) -> Option<Activity> {
        let nick = msg.nick()?;
        if self.identity.is_me(nick) {
            return None;
        }

        let channel = match msg.command.as_str() {
            "JOIN" => msg.channel_param()?,
            "PART" | "PRIVMSG" => msg.target()?,
            _ => return None,
        };
        if !channel.starts_with('#') || !self.channels.iter().any(|c| c == channel) {
            return None;
        }

        let retention = self.last_seen.retention();
        let absent_nick = self.last_seen.touch(channel, nick);
        let absent_host = msg
            .hostmask()
            .and_then(|mask| self.last_seen.touch(channel, &mask));

        let recent = |absent: Option<std::time::Duration>| absent.is_some_and(|d| d <= retention);
        let is_new = !recent(absent_nick) && !recent(absent_host);

        let interval = self.last_seen.write_interval();
        let stale = |absent: Option<std::time::Duration>| absent.is_none_or(|d| d > interval);

        Some(Activity {
            nick: nick.to_string(),
            channel: channel.to_string(),
            is_new,
            is_join: msg.is("JOIN"),
            flush_due: stale(absent_nick) || stale(absent_host),
        })
    }

    fn greeting(&self, nick: &str) -> String {
        self.template
            .replace("{nick}", nick)
            .replace("{bot}", &self.identity.nick())
    }
}

#[async_trait]
impl Handler for GreetListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        let Some(activity) = self.observe(msg) else {
            return Ok(Flow::Continue);
        };
        if activity.is_join && activity.is_new {
            info!(nick = %activity.nick, channel = %activity.channel, "Greeting newcomer");
            self.outbox
                .privmsg(&activity.channel, &self.greeting(&activity.nick));
        }
        if activity.flush_due
            && let Err(e) = self.last_seen.flush_if_due_off_worker().await
        {
            warn!(error = %e, "Could not write last-seen");
        }
        Ok(Flow::Continue)
    }
}
