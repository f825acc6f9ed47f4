//! Private commands for the nicks on the admin list.
//!
//! - `msg <channel> <text>`: post text somewhere
//! - `quit` / `exit`: ask for confirmation
//! - `REALLY_QUIT`: shut the bot down
//! - `settopic #<channel>`: run the topic changer for a channel now

use super::core::{Flow, Handler, HandlerResult};
use super::topic::TopicChanger;
use crate::error::HandlerError;
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use frank_proto::Message;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// A parsed admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand<'a> {
    Say { channel: &'a str, text: &'a str },
    Quit,
    ReallyQuit,
    SetTopic { channel: &'a str },
}

impl<'a> AdminCommand<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        if let Some(rest) = text.strip_prefix("msg ") {
            let (channel, text) = rest.split_once(' ')?;
            return Some(Self::Say { channel, text });
        }
        if text.starts_with("settopic #") {
            let channel = text["settopic ".len()..].trim();
            return Some(Self::SetTopic { channel });
        }
        match text {
            "quit" | "exit" => Some(Self::Quit),
            "REALLY_QUIT" => Some(Self::ReallyQuit),
            _ => None,
        }
    }
}

pub struct AdminListener {
    identity: Arc<Identity>,
    outbox: Outbox,
    shutdown_tx: broadcast::Sender<()>,
    topic: Option<Arc<TopicChanger>>,
}

impl AdminListener {
    pub fn new(
        identity: Arc<Identity>,
        outbox: Outbox,
        shutdown_tx: broadcast::Sender<()>,
        topic: Option<Arc<TopicChanger>>,
    ) -> Self {
        Self {
            identity,
            outbox,
            shutdown_tx,
            topic,
        }
    }
}

#[async_trait]
impl Handler for AdminListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !self.identity.is_private_query(msg) || !self.identity.is_admin(msg) {
            return Ok(Flow::Continue);
        }
        let Some(nick) = msg.nick() else {
            return Ok(Flow::Continue);
        };
        let Some(command) = AdminCommand::parse(msg.text()) else {
            return Ok(Flow::Continue);
        };

        match command {
            AdminCommand::Say { channel, text } => {
                info!(admin = %nick, channel = %channel, text = %text, "Posting on behalf of admin");
                self.outbox.privmsg(channel, text);
            }
            AdminCommand::Quit => {
                let me = self.identity.nick();
                self.outbox.privmsg(
                    nick,
                    &format!("If you really want {me} to exit, type: REALLY_QUIT"),
                );
            }
            AdminCommand::ReallyQuit => {
                self.outbox.privmsg(nick, "As you wish.");
                warn!(admin = %nick, "Quit requested");
                if self.shutdown_tx.send(()).is_err() {
                    error!("Failed to send shutdown signal - no receivers");
                    return Err(HandlerError::Internal("shutdown signal failed".into()));
                }
            }
            AdminCommand::SetTopic { channel } => match &self.topic {
                Some(changer) => {
                    info!(admin = %nick, channel = %channel, "Topic update requested");
                    let changer = Arc::clone(changer);
                    let channel = channel.to_string();
                    tokio::spawn(async move { changer.set_topic(&channel).await });
                }
                None => self.outbox.privmsg(nick, "The topic changer is not configured."),
            },
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse() {
        assert_eq!(
            AdminCommand::parse("msg #test hello there"),
            Some(AdminCommand::Say {
                channel: "#test",
                text: "hello there"
            })
        );
        assert_eq!(AdminCommand::parse("msg #test"), None);
        assert_eq!(AdminCommand::parse("exit"), Some(AdminCommand::Quit));
        assert_eq!(AdminCommand::parse("REALLY_QUIT"), Some(AdminCommand::ReallyQuit));
        assert_eq!(AdminCommand::parse("really_quit"), None);
        assert_eq!(
            AdminCommand::parse("settopic #chaos-hd"),
            Some(AdminCommand::SetTopic { channel: "#chaos-hd" })
        );
        assert_eq!(AdminCommand::parse("settopic chaos-hd"), None);
    }

    fn setup() -> (
        AdminListener,
        mpsc::UnboundedReceiver<String>,
        broadcast::Receiver<()>,
    ) {
        let (outbox, rx) = Outbox::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let identity = Arc::new(Identity::new("frank", vec!["alice".to_string()]));
        (
            AdminListener::new(identity, outbox, shutdown_tx, None),
            rx,
            shutdown_rx,
        )
    }

    #[tokio::test]
    async fn test_quit_needs_confirmation() {
        let (listener, mut rx, mut shutdown) = setup();
        let quit: Message = ":alice!a@h PRIVMSG frank :quit".parse().unwrap();
        let really: Message = ":alice!a@h PRIVMSG frank :REALLY_QUIT".parse().unwrap();

        listener.handle(&quit).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            "PRIVMSG alice :If you really want frank to exit, type: REALLY_QUIT"
        );
        assert!(shutdown.try_recv().is_err());

        listener.handle(&really).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "PRIVMSG alice :As you wish.");
        assert!(shutdown.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_non_admins_and_public_lines_are_ignored() {
        let (listener, mut rx, mut shutdown) = setup();
        let stranger: Message = ":mallory!m@h PRIVMSG frank :REALLY_QUIT".parse().unwrap();
        let public: Message = ":alice!a@h PRIVMSG #test :msg #test hi".parse().unwrap();

        listener.handle(&stranger).await.unwrap();
        listener.handle(&public).await.unwrap();
        assert!(rx.try_recv().is_err());
        assert!(shutdown.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_say() {
        let (listener, mut rx, _shutdown) = setup();
        let say: Message = ":alice!a@h PRIVMSG frank :msg #test hello all".parse().unwrap();
        listener.handle(&say).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "PRIVMSG #test :hello all");
    }
}
