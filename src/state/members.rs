//! Channel membership tracking.
//!
//! `channel -> set of nicks`, fed from NAMES replies, JOIN, PART, KICK, QUIT
//! and NICK. Lost on restart; the next NAMES reply after joining refills it.

use crate::error::HandlerError;
use frank_proto::{Message, RPL_NAMREPLY};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Channel status sigils a NAMES reply may put in front of a nick.
const NAMES_SIGILS: &[char] = &['~', '&', '@', '%', '+'];

/// A membership change extracted from a protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// One line of a NAMES reply. A roster may span several lines, so the
    /// nicks are added to whatever is already known.
    Names { channel: String, nicks: Vec<String> },
    Join { nick: String, channel: String },
    Part { nick: String, channel: String },
    Kick { nick: String, channel: String },
    Quit { nick: String },
    Rename { from: String, to: String },
}

impl MembershipEvent {
    /// Extract the membership event carried by `msg`.
    ///
    /// `Ok(None)` for commands that do not affect membership, `Err` for a
    /// relevant command missing its parameters.
    pub fn from_message(msg: &Message) -> Result<Option<Self>, HandlerError> {
        let command = msg.command.as_str();
        let nick = || {
            msg.nick()
                .map(str::to_string)
                .ok_or_else(|| HandlerError::malformed(command, "no source nick"))
        };

        let event = match command {
            RPL_NAMREPLY => {
                // me, sigil ("=" public, "@" secret, ...), channel, then nicks
                let channel = msg
                    .param(2)
                    .ok_or_else(|| HandlerError::need_more_params(command))?;
                let names = msg.trailing.as_deref().or(msg.param(3)).unwrap_or("");
                let nicks = names
                    .split(' ')
                    .map(|n| n.trim().trim_start_matches(NAMES_SIGILS))
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                Self::Names {
                    channel: channel.to_string(),
                    nicks,
                }
            }
            "JOIN" => Self::Join {
                nick: nick()?,
                channel: msg
                    .channel_param()
                    .ok_or_else(|| HandlerError::need_more_params(command))?
                    .to_string(),
            },
            "PART" => Self::Part {
                nick: nick()?,
                channel: msg
                    .target()
                    .ok_or_else(|| HandlerError::need_more_params(command))?
                    .to_string(),
            },
            "KICK" => {
                let (Some(channel), Some(kicked)) = (msg.param(0), msg.param(1)) else {
                    return Err(HandlerError::need_more_params(command));
                };
                Self::Kick {
                    nick: kicked.to_string(),
                    channel: channel.to_string(),
                }
            }
            "QUIT" => Self::Quit { nick: nick()? },
            "NICK" => Self::Rename {
                from: nick()?,
                to: msg
                    .trailing
                    .as_deref()
                    .or(msg.param(0))
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| HandlerError::need_more_params(command))?
                    .to_string(),
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Who is in which channel.
#[derive(Debug, Default)]
pub struct MembershipTracker {
    channels: RwLock<HashMap<String, HashSet<String>>>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a protocol message. Returns whether it was a membership event.
    pub fn handle_message(&self, msg: &Message) -> Result<bool, HandlerError> {
        match MembershipEvent::from_message(msg)? {
            Some(event) => {
                self.apply(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply one membership change.
    pub fn apply(&self, event: MembershipEvent) {
        let mut channels = self.channels.write();
        match event {
            MembershipEvent::Names { channel, nicks } => {
                channels.entry(channel).or_default().extend(nicks);
            }
            MembershipEvent::Join { nick, channel } => {
                channels.entry(channel).or_default().insert(nick);
            }
            MembershipEvent::Part { nick, channel } | MembershipEvent::Kick { nick, channel } => {
                if let Some(members) = channels.get_mut(&channel) {
                    members.remove(&nick);
                    if members.is_empty() {
                        channels.remove(&channel);
                    }
                }
            }
            MembershipEvent::Quit { nick } => {
                for members in channels.values_mut() {
                    members.remove(&nick);
                }
                channels.retain(|_, members| !members.is_empty());
            }
            MembershipEvent::Rename { from, to } => {
                for members in channels.values_mut() {
                    if members.remove(&from) {
                        members.insert(to.clone());
                    }
                }
            }
        }
        debug!(channels = channels.len(), "membership updated");
    }

    pub fn is_member(&self, nick: &str, channel: &str) -> bool {
        self.channels
            .read()
            .get(channel)
            .is_some_and(|members| members.contains(nick))
    }

    /// Sorted nicks present in `channel`.
    pub fn members(&self, channel: &str) -> Vec<String> {
        let mut nicks: Vec<String> = self
            .channels
            .read()
            .get(channel)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        nicks.sort();
        nicks
    }

    /// Sorted channels `nick` is present in.
    pub fn channels_of(&self, nick: &str) -> Vec<String> {
        let mut found: Vec<String> = self
            .channels
            .read()
            .iter()
            .filter(|(_, members)| members.contains(nick))
            .map(|(channel, _)| channel.clone())
            .collect();
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(line: &str) -> Message {
        line.parse().unwrap()
    }

    #[test]
    fn test_names_reply_strips_sigils() {
        let tracker = MembershipTracker::new();
        let handled = tracker
            .handle_message(&msg(":irc.example.net 353 frank = #test :@alice +bob ~carol  dave"))
            .unwrap();
        assert!(handled);
        assert_eq!(tracker.members("#test"), vec!["alice", "bob", "carol", "dave"]);
    }

    #[test]
    fn test_names_reply_is_additive() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":s 353 frank = #test :alice")).unwrap();
        tracker.handle_message(&msg(":s 353 frank = #test :bob")).unwrap();
        assert!(tracker.is_member("alice", "#test"));
        assert!(tracker.is_member("bob", "#test"));
    }

    #[test]
    fn test_join_and_part() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":carol!c@host JOIN :#test")).unwrap();
        assert!(tracker.is_member("carol", "#test"));

        tracker.handle_message(&msg(":carol!c@host PART #test :bye")).unwrap();
        assert!(!tracker.is_member("carol", "#test"));
    }

    #[test]
    fn test_rename_moves_across_channels() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":A!a@h JOIN #a")).unwrap();
        tracker.handle_message(&msg(":A!a@h JOIN #b")).unwrap();
        tracker.handle_message(&msg(":other!o@h JOIN #c")).unwrap();

        tracker.handle_message(&msg(":A!a@h NICK :B")).unwrap();

        assert_eq!(tracker.channels_of("B"), vec!["#a", "#b"]);
        assert!(tracker.channels_of("A").is_empty());
        assert!(!tracker.is_member("B", "#c"));
    }

    #[test]
    fn test_quit_removes_everywhere_idempotently() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":N!n@h JOIN #a")).unwrap();
        tracker.handle_message(&msg(":N!n@h JOIN #b")).unwrap();
        tracker.handle_message(&msg(":M!m@h JOIN #b")).unwrap();

        tracker.handle_message(&msg(":N!n@h QUIT :gone")).unwrap();
        assert!(tracker.channels_of("N").is_empty());
        assert!(tracker.is_member("M", "#b"));

        assert!(tracker.handle_message(&msg(":N!n@h QUIT :gone")).is_ok());
        assert!(tracker.channels_of("N").is_empty());
    }

    #[test]
    fn test_kick_removes_target_not_kicker() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":op!o@h JOIN #test")).unwrap();
        tracker.handle_message(&msg(":troll!t@h JOIN #test")).unwrap();

        tracker.handle_message(&msg(":op!o@h KICK #test troll :out")).unwrap();
        assert!(!tracker.is_member("troll", "#test"));
        assert!(tracker.is_member("op", "#test"));
    }

    #[test]
    fn test_part_then_names_does_not_resurrect_stale_entries() {
        let tracker = MembershipTracker::new();
        tracker.handle_message(&msg(":x!x@h JOIN #test")).unwrap();
        tracker.handle_message(&msg(":x!x@h PART #test")).unwrap();
        tracker.handle_message(&msg(":s 353 frank = #test :y")).unwrap();
        assert_eq!(tracker.members("#test"), vec!["y"]);
    }

    #[test]
    fn test_malformed_events_are_errors_not_panics() {
        let tracker = MembershipTracker::new();
        assert!(tracker.handle_message(&msg(":s 353 frank =")).is_err());
        assert!(tracker.handle_message(&msg("PART #test")).is_err());
        assert!(tracker.handle_message(&msg(":op!o@h KICK #test")).is_err());
        assert!(tracker.handle_message(&msg(":a!a@h NICK")).is_err());
    }

    #[test]
    fn test_uninteresting_commands_are_ignored() {
        let tracker = MembershipTracker::new();
        let handled = tracker
            .handle_message(&msg(":a!a@h PRIVMSG #test :hi"))
            .unwrap();
        assert!(!handled);
    }
}
