//! Core protocol types for the proxy → backend login channel.
//!
//! Everything in this module travels "on the wire": the proxy encodes a
//! [`LoginActionMessage`] after it has decided how a player should be
//! treated, and the backend decodes it to start (or skip) a forced login.
//!
//! The schema is fixed. There is no version field and no negotiation:
//! the codec version is implied by the deployed proxy/backend pair.

use std::fmt;

use uuid::Uuid;

/// Name of the plugin-message channel the proxy writes login actions to.
///
/// Backends ignore anything that arrives on another channel.
pub const FORCE_CHANNEL: &str = "fastlogin:force";

/// Longest player name the game accepts. Names on the wire are checked
/// against this limit on both encode and decode.
pub const MAX_NAME_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable in-process identity of a player.
///
/// Unlike the network address (which is reused across reconnects) this
/// identifies the player's account, so it keys state that must be
/// queryable by unrelated consumers, e.g. the premium status cache.
///
/// Newtype over [`Uuid`] so a `PlayerId` can never be passed where a
/// [`ProxyId`] is expected, even though both are UUIDs underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub Uuid);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single proxy instance.
///
/// Each proxy is configured with a random UUID and stamps it into every
/// message it sends. Backends only act on messages whose `ProxyId` is in
/// their allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(pub Uuid);

impl ProxyId {
    /// Generates a fresh random proxy identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// What the proxy wants the backend to do with a player.
///
/// The discriminant values are part of the wire format: a single byte
/// follows the player name. Anything outside `0..=2` is a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionType {
    /// The proxy verified the player and the account already exists:
    /// log them in without a password.
    Login = 0,

    /// The proxy verified the player and wants the account created if
    /// the backend doesn't know it yet.
    Register = 1,

    /// The player is not verified upstream. No forced login; the player
    /// goes through normal password authentication.
    Cracked = 2,
}

impl ActionType {
    /// Returns the wire discriminant.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parses a wire discriminant. `None` for out-of-range values.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Login),
            1 => Some(Self::Register),
            2 => Some(Self::Cracked),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "LOGIN",
            Self::Register => "REGISTER",
            Self::Cracked => "CRACKED",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// LoginActionMessage
// ---------------------------------------------------------------------------

/// The one message the proxy sends to a backend.
///
/// Wire layout, in order:
///
/// ```text
/// [u16 BE name length][name: UTF-8][u8 action type][16 bytes proxy UUID]
/// ```
///
/// Immutable once decoded; the listener only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginActionMessage {
    /// Name of the player this action is about. Not necessarily the
    /// player whose connection carried the message.
    pub player_name: String,

    /// What to do with the player.
    pub action: ActionType,

    /// The proxy that sent this message.
    pub proxy_id: ProxyId,
}

impl LoginActionMessage {
    /// Convenience constructor.
    pub fn new(
        player_name: impl Into<String>,
        action: ActionType,
        proxy_id: ProxyId,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            action,
            proxy_id,
        }
    }
}

impl fmt::Display for LoginActionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {} from proxy {}",
            self.action, self.player_name, self.proxy_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_from_byte_roundtrips_known_values() {
        for action in [ActionType::Login, ActionType::Register, ActionType::Cracked] {
            assert_eq!(ActionType::from_byte(action.as_byte()), Some(action));
        }
    }

    #[test]
    fn test_action_type_from_byte_rejects_out_of_range() {
        assert_eq!(ActionType::from_byte(3), None);
        assert_eq!(ActionType::from_byte(u8::MAX), None);
    }

    #[test]
    fn test_message_display_mentions_all_fields() {
        let proxy = ProxyId(Uuid::nil());
        let msg = LoginActionMessage::new("Alice", ActionType::Register, proxy);
        let shown = msg.to_string();
        assert!(shown.contains("REGISTER"));
        assert!(shown.contains("Alice"));
        assert!(shown.contains(&Uuid::nil().to_string()));
    }
}
