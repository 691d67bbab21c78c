//! Error types for the protocol layer.
//!
//! Decoding fails closed: every variant here means "drop the whole
//! message". There is never a partially populated [`LoginActionMessage`].
//!
//! [`LoginActionMessage`]: crate::LoginActionMessage

/// Errors that can occur while encoding or decoding a login action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The payload ended before the named field was complete.
    #[error("truncated message: missing {0}")]
    Truncated(&'static str),

    /// The player name bytes are not valid UTF-8.
    #[error("player name is not valid UTF-8")]
    InvalidUtf8,

    /// The player name is empty.
    #[error("player name is empty")]
    EmptyName,

    /// The player name is longer than the game allows.
    #[error("player name is {0} characters, limit is {max}", max = crate::MAX_NAME_LEN)]
    NameTooLong(usize),

    /// The action discriminant is outside the known range.
    #[error("unknown action type {0}")]
    UnknownAction(u8),

    /// Extra bytes followed the proxy id.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}
