//! `!raum`: is the hackerspace open? Answered by pinging a host inside it.

use super::core::{Flow, Handler, HandlerResult};
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use frank_proto::Message;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{info, warn};

lazy_static! {
    static ref BANG_RAUM: Regex = Regex::new(r"(?i)^!raum($|\s)").unwrap();
}

const OPEN: &str = "Pluta replies, so the room is likley open \\o/";
const CLOSED: &str = "No reply, so room is probably not yet open.";

/// Checks whether the room's host answers.
#[async_trait]
pub trait RoomProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes with the system `ping`.
pub struct PingProbe {
    host: String,
}

impl PingProbe {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

#[async_trait]
impl RoomProbe for PingProbe {
    async fn is_reachable(&self) -> bool {
        let status = Command::new("ping")
            .args(["-q", "-c", "3", "-w", "1"])
            .arg(&self.host)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(host = %self.host, error = %e, "Could not run ping");
                false
            }
        }
    }
}

pub struct RaumbangListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    probe: Arc<dyn RoomProbe>,
    cooldown: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RaumbangListener {
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        probe: Arc<dyn RoomProbe>,
        cooldown: Duration,
    ) -> Self {
        Self {
            identity,
            outbox,
            probe,
            cooldown,
            last_request: Mutex::new(None),
        }
    }

    fn claim(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_request.lock();
        if let Some(prev) = *last
            && now.duration_since(prev) <= self.cooldown
        {
            return false;
        }
        *last = Some(now);
        true
    }
}

#[async_trait]
impl Handler for RaumbangListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !self.identity.is_private_query(msg) || !BANG_RAUM.is_match(msg.text()) {
            return Ok(Flow::Continue);
        }
        let Some(nick) = msg.nick() else {
            return Ok(Flow::Continue);
        };
        if !self.claim() {
            warn!(nick = %nick, "Room status requested too often, skipping");
            return Ok(Flow::Continue);
        }

        info!(nick = %nick, "Room status requested");
        let reply = if self.probe.is_reachable().await {
            OPEN
        } else {
            CLOSED
        };
        self.outbox.privmsg(nick, reply);
        Ok(Flow::Continue)
    }
}
