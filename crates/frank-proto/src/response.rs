//! Numeric replies the bot reacts to.
//!
//! Only the handful of numerics that drive bot behaviour are named here; any
//! other numeric still parses as a plain three-digit command.

/// Registration succeeded.
pub const RPL_WELCOME: &str = "001";
/// No topic is set (`<me> <channel> :No topic is set`).
pub const RPL_NOTOPIC: &str = "331";
/// Topic reply (`<me> <channel> :<topic>`).
pub const RPL_TOPIC: &str = "332";
/// Names list (`<me> <sigil> <channel> :<nicks>`).
pub const RPL_NAMREPLY: &str = "353";
/// End of a names list.
pub const RPL_ENDOFNAMES: &str = "366";
/// Desired nickname is taken.
pub const ERR_NICKNAMEINUSE: &str = "433";

/// Whether `command` is a three-digit numeric reply.
pub fn is_numeric(command: &str) -> bool {
    command.len() == 3 && command.bytes().all(|b| b.is_ascii_digit())
}
