//! Follows invites from admins and chanserv.

use super::core::{Flow, Handler, HandlerResult};
use crate::error::HandlerError;
use crate::network::Outbox;
use crate::state::Identity;
use async_trait::async_trait;
use frank_proto::Message;
use std::sync::Arc;
use tracing::{info, warn};

pub struct InviteListener {
    identity: Arc<Identity>,
    outbox: Outbox,
}

impl InviteListener {
    pub fn new(identity: Arc<Identity>, outbox: Outbox) -> Self {
        Self { identity, outbox }
    }
}

#[async_trait]
impl Handler for InviteListener {
    async fn handle(&self, msg: &Message) -> HandlerResult {
        if !msg.is("INVITE") {
            return Ok(Flow::Continue);
        }
        let nick = msg.nick().unwrap_or_default();
        if !self.identity.is_admin(msg) && !nick.eq_ignore_ascii_case("chanserv") {
            info!(nick = %nick, "Not following invite from non-admin");
            return Ok(Flow::Continue);
        }
        if !msg.target().is_some_and(|t| self.identity.is_me(t)) {
            warn!(target = ?msg.target(), "Invite is not addressed to me");
            return Ok(Flow::Continue);
        }

        // Servers put the channel either in the trailing part or as a param.
        let channel = match msg.trailing.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => msg.param(1).unwrap_or_default(),
        };
        if channel.is_empty() {
            return Err(HandlerError::need_more_params("INVITE"));
        }
        info!(channel = %channel, "Following invite");
        self.outbox.join(channel);
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> (InviteListener, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (outbox, rx) = Outbox::new();
        let identity = Arc::new(Identity::new("frank", vec!["alice".to_string()]));
        (InviteListener::new(identity, outbox), rx)
    }

    #[tokio::test]
    async fn test_follows_admin_and_chanserv() {
        let (listener, mut rx) = listener();
        let admin: Message = ":alice!a@h INVITE frank :#secret".parse().unwrap();
        let chanserv: Message = ":ChanServ!s@services INVITE frank #other".parse().unwrap();

        listener.handle(&admin).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "JOIN #secret");
        listener.handle(&chanserv).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), "JOIN #other");
    }

    #[tokio::test]
    async fn test_ignores_strangers_and_foreign_targets() {
        let (listener, mut rx) = listener();
        let stranger: Message = ":mallory!m@h INVITE frank :#trap".parse().unwrap();
        let elsewhere: Message = ":alice!a@h INVITE bob :#secret".parse().unwrap();

        listener.handle(&stranger).await.unwrap();
        listener.handle(&elsewhere).await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
