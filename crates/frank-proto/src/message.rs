//! Owned IRC message type with parsing and serialization.

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;

/// One parsed protocol line.
///
/// `params` holds the middle parameters only; the final free-text field (the
/// one introduced by `" :"` on the wire) lives in `trailing`.
///
/// # Example
///
/// ```
/// use frank_proto::Message;
///
/// let msg: Message = ":carol!c@host PRIVMSG #test :hello there".parse().unwrap();
/// assert_eq!(msg.nick(), Some("carol"));
/// assert_eq!(msg.target(), Some("#test"));
/// assert_eq!(msg.text(), "hello there");
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Message source, absent for client-originated lines.
    pub prefix: Option<Prefix>,
    /// Command verb or three-digit numeric, upper-cased.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter.
    pub trailing: Option<String>,
}

impl Message {
    /// Build a message from its parts.
    pub fn new<C, P, S>(command: C, params: P, trailing: Option<S>) -> Self
    where
        C: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
            trailing: trailing.map(Into::into),
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<Prefix>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Nickname of the sender, if the prefix is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// `user@host` of the sender, if known.
    pub fn hostmask(&self) -> Option<String> {
        self.prefix.as_ref().and_then(Prefix::hostmask)
    }

    /// First middle parameter (channel or nick for PRIVMSG, PART, INVITE, ...).
    pub fn target(&self) -> Option<&str> {
        self.param(0)
    }

    /// Middle parameter `i`.
    pub fn param(&self, i: usize) -> Option<&str> {
        self.params.get(i).map(String::as_str)
    }

    /// Free text of the message.
    ///
    /// Servers may leave the colon off a one-word final parameter
    /// (`PRIVMSG #chan go++`), so without a trailing part the last middle
    /// parameter after the target is the text. Empty when there is none.
    pub fn text(&self) -> &str {
        match &self.trailing {
            Some(text) => text,
            None if self.params.len() > 1 => self.params.last().map_or("", String::as_str),
            None => "",
        }
    }

    /// The channel of a JOIN.
    ///
    /// Servers send either `JOIN #chan` or `JOIN :#chan`.
    pub fn channel_param(&self) -> Option<&str> {
        self.param(0)
            .or(self.trailing.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// Whether `command` matches, ignoring ASCII case.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Whether this is a PRIVMSG addressed directly to `me`.
    pub fn is_private_to(&self, me: &str) -> bool {
        self.is("PRIVMSG") && self.target() == Some(me)
    }

    /// PRIVMSG to a target.
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("PRIVMSG", [target.into()], Some(text.into()))
    }

    /// NOTICE to a target.
    #[must_use]
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("NOTICE", [target.into()], Some(text.into()))
    }

    /// JOIN a channel.
    #[must_use]
    pub fn join(channel: impl Into<String>) -> Self {
        Self::new("JOIN", [channel.into()], None::<String>)
    }

    /// Set a channel topic.
    #[must_use]
    pub fn topic(channel: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::new("TOPIC", [channel.into()], Some(topic.into()))
    }

    /// Ask the server for a channel topic.
    #[must_use]
    pub fn topic_query(channel: impl Into<String>) -> Self {
        Self::new("TOPIC", [channel.into()], None::<String>)
    }

    /// NICK registration or change.
    #[must_use]
    pub fn nick_change(nick: impl Into<String>) -> Self {
        Self::new("NICK", [nick.into()], None::<String>)
    }

    /// USER registration.
    #[must_use]
    pub fn user(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Self::new(
            "USER",
            [username.into(), "0".to_string(), "*".to_string()],
            Some(realname.into()),
        )
    }

    /// PONG answering a PING token.
    #[must_use]
    pub fn pong(token: impl Into<String>) -> Self {
        Self::new("PONG", Vec::<String>::new(), Some(token.into()))
    }

    /// MODE change with arguments.
    #[must_use]
    pub fn mode<I>(target: impl Into<String>, modes: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut params = vec![target.into(), modes.into()];
        params.extend(args.into_iter().map(Into::into));
        Self::new("MODE", params, None::<String>)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }
        if line.contains('\0') {
            return Err(MessageParseError::NulByte);
        }

        let mut rest = line.trim_start_matches(' ');

        // IRCv3 tags are not used by the bot; skip them.
        if rest.starts_with('@') {
            rest = match rest.split_once(' ') {
                Some((_, after)) => after.trim_start_matches(' '),
                None => return Err(MessageParseError::EmptyMessage),
            };
        }

        let prefix = if let Some(after_colon) = rest.strip_prefix(':') {
            let (raw, after) = after_colon
                .split_once(' ')
                .ok_or_else(|| MessageParseError::MissingCommand(after_colon.to_owned()))?;
            rest = after.trim_start_matches(' ');
            Some(Prefix::try_from_str(raw)?)
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, after)) => (cmd, after),
            None => (rest, ""),
        };
        if command.is_empty() {
            let source = prefix.map(|p| p.to_string()).unwrap_or_default();
            return Err(MessageParseError::MissingCommand(source));
        }
        if !command.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MessageParseError::InvalidCommand(command.to_owned()));
        }

        let mut params = Vec::new();
        let mut trailing = None;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(text) = rest.strip_prefix(':') {
                trailing = Some(text.to_owned());
                break;
            }
            match rest.split_once(' ') {
                Some((param, after)) => {
                    params.push(param.to_owned());
                    rest = after;
                }
                None => {
                    params.push(rest.to_owned());
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
            trailing,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        if let Some(trailing) = &self.trailing {
            write!(f, " :{trailing}")?;
        }
        Ok(())
    }
}
