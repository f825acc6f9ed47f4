//! # frank-proto
//!
//! Parsing and serialization of IRC protocol lines for the frank bot.
//!
//! ```rust
//! use frank_proto::{Message, Prefix};
//!
//! let msg: Message = ":carol!c@example.org JOIN :#test".parse().unwrap();
//! assert_eq!(msg.channel_param(), Some("#test"));
//! assert_eq!(msg.prefix, Some(Prefix::new("carol", "c", "example.org")));
//!
//! let reply = Message::privmsg("#test", "Hey carol! o/");
//! assert_eq!(reply.to_string(), "PRIVMSG #test :Hey carol! o/");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod message;
pub mod prefix;
pub mod response;

pub use error::MessageParseError;
pub use message::Message;
pub use prefix::Prefix;
pub use response::{
    ERR_NICKNAMEINUSE, RPL_ENDOFNAMES, RPL_NAMREPLY, RPL_NOTOPIC, RPL_TOPIC, RPL_WELCOME,
};
