//! Who the bot is and whom it obeys.

use frank_proto::Message;
use parking_lot::RwLock;

/// Current nick and the admin allow-list.
///
/// The nick changes when registration has to fall back to `nick_`.
#[derive(Debug)]
pub struct Identity {
    nick: RwLock<String>,
    admins: Vec<String>,
}

impl Identity {
    pub fn new(nick: impl Into<String>, admins: Vec<String>) -> Self {
        Self {
            nick: RwLock::new(nick.into()),
            admins,
        }
    }

    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    pub fn set_nick(&self, nick: impl Into<String>) {
        *self.nick.write() = nick.into();
    }

    /// Whether `nick` is the bot itself.
    pub fn is_me(&self, nick: &str) -> bool {
        *self.nick.read() == nick
    }

    /// Whether `msg` is a PRIVMSG addressed to the bot.
    pub fn is_private_query(&self, msg: &Message) -> bool {
        msg.is_private_to(&self.nick.read())
    }

    /// Whether the sender of `msg` is on the admin list.
    pub fn is_admin(&self, msg: &Message) -> bool {
        msg.nick()
            .is_some_and(|nick| self.admins.iter().any(|admin| admin == nick))
    }

    /// Where a reply to `msg` goes: the channel, or the sender for queries.
    pub fn reply_target<'a>(&self, msg: &'a Message) -> Option<&'a str> {
        if self.is_private_query(msg) {
            msg.nick()
        } else {
            msg.target()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_check_is_exact() {
        let id = Identity::new("frank", vec!["xeen".into()]);
        let ok: Message = ":xeen!x@h PRIVMSG frank :quit".parse().unwrap();
        let nope: Message = ":Xeen!x@h PRIVMSG frank :quit".parse().unwrap();
        assert!(id.is_admin(&ok));
        assert!(!id.is_admin(&nope));
    }

    #[test]
    fn test_reply_target_follows_nick_change() {
        let id = Identity::new("frank", vec![]);
        let query: Message = ":carol!c@h PRIVMSG frank_ :karma rust".parse().unwrap();
        assert_eq!(id.reply_target(&query), Some("frank_"));

        id.set_nick("frank_");
        assert!(id.is_me("frank_"));
        assert_eq!(id.reply_target(&query), Some("carol"));
    }
}
