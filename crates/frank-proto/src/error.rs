//! Error types for IRC line parsing.

use thiserror::Error;

/// Convenience type alias for parse results.
pub type Result<T, E = MessageParseError> = std::result::Result<T, E>;

/// Errors produced while turning a raw line into a [`Message`](crate::Message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty (or only whitespace / line terminators).
    #[error("empty message")]
    EmptyMessage,

    /// A prefix (`:source`) was present but nothing followed it.
    #[error("missing command after prefix {0:?}")]
    MissingCommand(String),

    /// The prefix contained characters that cannot appear in a source.
    #[error("invalid prefix: {0:?}")]
    InvalidPrefix(String),

    /// The command verb contained characters other than letters or digits.
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),

    /// A NUL byte was found inside the line.
    #[error("line contains a NUL byte")]
    NulByte,
}
