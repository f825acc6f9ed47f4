//! `thing++` / `thing--` voting and `karma thing` queries.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::{Identity, KarmaStore};
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

lazy_static! {
    /// `thing++` or `thing--`, optionally followed by ` # comment`.
    static ref VOTE: Regex = Regex::new(r"^([\d\pL]+)(\+\+|--)(?:$|\s#)").unwrap();
    /// `karma thing`, `karma: for thing?`
    static ref QUERY: Regex = Regex::new(r"(?i)^karma:?\s+(?:for\s+)?([\d\pL]+)\??$").unwrap();
}

/// A parsed karma request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KarmaCommand<'a> {
    Vote { thing: &'a str, delta: i64 },
    Query { thing: &'a str },
}

impl<'a> KarmaCommand<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        if let Some(caps) = VOTE.captures(text) {
            let thing = caps.get(1)?.as_str();
            let delta = if &caps[2] == "++" { 1 } else { -1 };
            return Some(Self::Vote { thing, delta });
        }
        QUERY
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| Self::Query { thing: m.as_str() })
    }
}

pub struct KarmaListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    store: Arc<KarmaStore>,
}

impl KarmaListener {
    pub fn new(identity: Arc<Identity>, outbox: Outbox, store: Arc<KarmaStore>) -> Self {
        Self {
            identity,
            outbox,
            store,
        }
    }

    async fn vote(&self, msg: &Message, nick: &str, thing: &str, delta: i64) {
        // Votes have to be public.
        if !msg.target().is_some_and(|t| t.starts_with('#')) {
            return;
        }
        if thing.to_lowercase() == nick.to_lowercase() {
            info!(nick = %nick, "Refusing self-vote");
            self.outbox
                .privmsg(nick, "[Karma] Voting on yourself is not supported");
            return;
        }

        let score = self.store.vote(thing, delta);
        info!(thing = %thing, delta, score, "Karma changed");
        if let Err(e) = self.store.save_off_worker().await {
            warn!(error = %e, "Could not write karma");
        }
    }
}

#[async_trait]
impl Handler for KarmaListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !msg.is("PRIVMSG") {
            return Ok(Flow::Continue);
        }
        let Some(nick) = msg.nick() else {
            return Ok(Flow::Continue);
        };

        match KarmaCommand::parse(msg.text()) {
            Some(KarmaCommand::Vote { thing, delta }) => {
                self.vote(msg, nick, thing, delta).await
            }
            Some(KarmaCommand::Query { thing }) => {
                if let Some(target) = self.identity.reply_target(msg) {
                    let score = self.store.score(thing);
                    self.outbox
                        .privmsg(target, &format!("[Karma] {thing}: {score}"));
                }
            }
            None => {}
        }
        Ok(Flow::Continue)
    }
}
