//! Outbound queue towards the server connection.
//!
//! Posting never blocks and never fails from the caller's point of view. The
//! connection task drains the queue; if it is gone the process is shutting
//! down anyway.

use frank_proto::Message;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Cloneable handle for queueing raw protocol lines.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
    /// Ask chanserv for an invite before joining.
    chanserv_invite: bool,
}

impl Outbox {
    /// Create an outbox and the receiving end the connection drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                chanserv_invite: false,
            },
            rx,
        )
    }

    /// Enable `invite #channel` requests to chanserv before each join.
    #[must_use]
    pub fn with_chanserv_invite(mut self, enabled: bool) -> Self {
        self.chanserv_invite = enabled;
        self
    }

    /// Queue one raw line.
    pub fn post(&self, line: impl Into<String>) {
        let line = line.into();
        if self.tx.send(line).is_err() {
            error!("Connection writer is gone, dropping outbound line");
        }
    }

    pub fn send(&self, msg: Message) {
        self.post(msg.to_string());
    }

    pub fn privmsg(&self, target: &str, text: &str) {
        self.send(Message::privmsg(target, text));
    }

    pub fn notice(&self, target: &str, text: &str) {
        self.send(Message::notice(target, text));
    }

    pub fn topic(&self, channel: &str, topic: &str) {
        self.send(Message::topic(channel, topic));
    }

    pub fn mode(&self, target: &str, modes: &str, args: &[&str]) {
        self.send(Message::mode(target, modes, args.iter().copied()));
    }

    /// Join `channel`, with or without its leading `#`.
    pub fn join(&self, channel: &str) {
        let name = channel.trim().trim_start_matches('#');
        if name.is_empty() {
            return;
        }
        let channel = format!("#{name}");
        info!(channel = %channel, "Joining");
        if self.chanserv_invite {
            self.privmsg("chanserv", &format!("invite {channel}"));
        }
        self.send(Message::join(channel));
    }

    /// Whether the connection side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
