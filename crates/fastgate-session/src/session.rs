//! Session types: what the backend knows about one authentication attempt.
//!
//! A [`LoginSession`] is the transient working state of a single attempt.
//! It is created when the proxy vouches for a player (or when a local
//! premium check succeeds), consumed by the force-login reconciler, and
//! thrown away when the connection closes.

use std::fmt;

// ---------------------------------------------------------------------------
// LoginSession
// ---------------------------------------------------------------------------

/// An in-flight login attempt, keyed by the player's network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    /// Name the proxy (or local check) vouched for.
    pub player_name: String,

    /// `true` once the premium/cracked determination is confirmed. Proxy
    /// sessions are verified as soon as the sender is trusted.
    pub verified: bool,

    /// `true` for a fresh-registration flow, `false` when the player logs
    /// into an account the auth plugin already has.
    pub registered: bool,
}

impl LoginSession {
    /// An existing-account login attempt, not yet verified.
    pub fn login(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            verified: false,
            registered: false,
        }
    }

    /// A fresh-registration attempt, not yet verified.
    pub fn registration(player_name: impl Into<String>) -> Self {
        Self {
            registered: true,
            ..Self::login(player_name)
        }
    }

    /// Returns the session marked as verified.
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }
}

// ---------------------------------------------------------------------------
// LoginPhase
// ---------------------------------------------------------------------------

/// Where a connection is in the forced-login handshake.
///
/// Two independent events drive it: the proxy message (which stores a
/// session) and the server's own join event. Whichever arrives second
/// moves the connection into `Reconciling`:
///
/// ```text
///            store_session               mark_joined
///   New ───────────────→ AwaitingJoin ───────────────┐
///    │                                               ▼
///    │       mark_joined                store_session
///    └──────────────────→ AwaitingMessage ────→ Reconciling ──→ Blocked
/// ```
///
/// `Blocked` means "this connection is finalized": further login actions
/// for it are rejected until it disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginPhase {
    /// Nothing observed yet.
    #[default]
    New,
    /// A session is stored; waiting for the join event.
    AwaitingJoin,
    /// The join event fired; waiting for a session.
    AwaitingMessage,
    /// The reconciler has been scheduled and hasn't finished.
    Reconciling,
    /// Reconciliation finished (either way). No more login actions.
    Blocked,
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::AwaitingJoin => "awaiting-join",
            Self::AwaitingMessage => "awaiting-message",
            Self::Reconciling => "reconciling",
            Self::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ReadyDecision
// ---------------------------------------------------------------------------

/// Outcome of one side of the join/message race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyDecision {
    /// This caller observed the other side's effect: it must schedule the
    /// reconciler with the enclosed session.
    Schedule(LoginSession),
    /// The other side hasn't happened yet; it will schedule.
    Defer,
    /// A reconciliation is already running or done for this connection.
    Duplicate,
}

// ---------------------------------------------------------------------------
// ConnectionSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of one connection's login state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionSnapshot {
    pub phase: LoginPhase,
    /// Whether the join event has fired (the JoinFlag).
    pub joined: bool,
    /// Whether a login session is stored for the connection's address.
    pub has_session: bool,
}

impl ConnectionSnapshot {
    /// Whether the connection carries the blocked tag.
    pub fn is_blocked(&self) -> bool {
        self.phase == LoginPhase::Blocked
    }
}
