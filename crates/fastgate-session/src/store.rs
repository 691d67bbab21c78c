//! The login store: sessions, join flags and blocked tags for every
//! connection on this backend.
//!
//! This is where the join-event vs. proxy-message race is decided. Both
//! event paths call exactly one method here ([`LoginStore::store_session`]
//! or [`LoginStore::mark_joined`]) and act on the returned
//! [`ReadyDecision`]. Because each method reads and writes the
//! session/flag pair in one `&mut self` call, the check-then-schedule step
//! is atomic as long as the store sits behind a single lock.
//!
//! # Concurrency note
//!
//! `LoginStore` is NOT thread-safe by itself; it uses plain `HashMap`s.
//! The gate wraps it in one `tokio::sync::Mutex` shared by the main loop
//! and background tasks. The event rate is a handful per player login,
//! so a single coarse lock is plenty.

use std::collections::HashMap;
use std::net::SocketAddr;

use fastgate_protocol::PlayerId;

use crate::{ConnectionSnapshot, LoginPhase, LoginSession, Player, ReadyDecision};

/// Per-connection state that outlives neither the connection nor a
/// reconnect.
#[derive(Debug, Clone, Copy)]
struct ConnectionState {
    /// Address the connection came from. Keys its login session.
    address: SocketAddr,
    /// Distinguishes this connection from earlier ones of the same player,
    /// even when the address is reused.
    generation: u64,
    phase: LoginPhase,
    /// The JoinFlag. Monotonic: set once, cleared only by `remove`.
    joined: bool,
}

impl ConnectionState {
    fn new(address: SocketAddr, generation: u64) -> Self {
        Self {
            address,
            generation,
            phase: LoginPhase::New,
            joined: false,
        }
    }
}

/// Owns every piece of per-connection login state.
///
/// ## Lifecycle
///
/// ```text
/// track() ──→ store_session() ─┐
///                              ├─→ Schedule ──→ finish_reconcile() ──→ [Blocked]
///             mark_joined()  ──┘                                          │
///                                                                         ▼
///                                                              remove() on quit
/// ```
///
/// Work that outlives the event which started it (the join settle delay,
/// the REGISTER query) holds on to the connection's generation from
/// [`track`](LoginStore::track) and only touches the store while it
/// still matches.
#[derive(Debug, Default)]
pub struct LoginStore {
    /// Login sessions keyed by remote address, the only handle available
    /// before the server has a player object.
    sessions: HashMap<SocketAddr, LoginSession>,

    /// Connection state keyed by player identity.
    connections: HashMap<PlayerId, ConnectionState>,

    /// Last generation handed out.
    generation: u64,
}

impl LoginStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracked connection, if it is this player's connection.
    fn current(&self, player: &Player) -> Option<&ConnectionState> {
        self.connections
            .get(&player.id)
            .filter(|c| c.address == player.address)
    }

    /// Starts tracking a connection and returns its generation.
    /// Idempotent for the same connection; existing state is kept.
    pub fn track(&mut self, player: &Player) -> u64 {
        connection_mut(&mut self.connections, &mut self.sessions, &mut self.generation, player)
            .generation
    }

    /// Whether `generation` still names the player's tracked connection.
    pub fn is_current(&self, player: &Player, generation: u64) -> bool {
        self.current(player).is_some_and(|c| c.generation == generation)
    }

    /// Like [`store_session`](Self::store_session), but only while
    /// `generation` still names the player's connection. Background tasks
    /// use this so a result arriving after a quit (or a reconnect) can't
    /// touch the wrong connection.
    pub fn store_session_if_current(
        &mut self,
        player: &Player,
        generation: u64,
        session: LoginSession,
    ) -> Option<ReadyDecision> {
        if !self.is_current(player, generation) {
            return None;
        }
        Some(self.store_session(player, session))
    }

    /// Stores a session for the player's address and decides whether the
    /// caller must schedule the reconciler.
    ///
    /// - join already fired → `Schedule` (this message is the late one)
    /// - join not yet fired → `Defer` (the join handler will schedule)
    /// - already reconciling or blocked → `Duplicate`, session untouched
    pub fn store_session(
        &mut self,
        player: &Player,
        session: LoginSession,
    ) -> ReadyDecision {
        let state =
            connection_mut(&mut self.connections, &mut self.sessions, &mut self.generation, player);

        match state.phase {
            LoginPhase::Reconciling | LoginPhase::Blocked => {
                tracing::debug!(
                    %player, phase = %state.phase,
                    "login session ignored, connection already finalizing"
                );
                return ReadyDecision::Duplicate;
            }
            LoginPhase::AwaitingMessage => {
                state.phase = LoginPhase::Reconciling;
                self.sessions.insert(player.address, session.clone());
                return ReadyDecision::Schedule(session);
            }
            LoginPhase::New | LoginPhase::AwaitingJoin => {
                state.phase = LoginPhase::AwaitingJoin;
            }
        }

        self.sessions.insert(player.address, session);
        tracing::debug!(%player, "login session stored, waiting for join event");
        ReadyDecision::Defer
    }

    /// Sets the player's JoinFlag and decides whether the caller must
    /// schedule the reconciler.
    ///
    /// The flag is set regardless of the outcome so that a message
    /// arriving later knows the join event already fired.
    pub fn mark_joined(&mut self, player: &Player) -> ReadyDecision {
        let state =
            connection_mut(&mut self.connections, &mut self.sessions, &mut self.generation, player);
        state.joined = true;

        match state.phase {
            LoginPhase::AwaitingJoin => match self.sessions.get(&player.address) {
                Some(session) => {
                    state.phase = LoginPhase::Reconciling;
                    ReadyDecision::Schedule(session.clone())
                }
                // Session vanished without a quit; wait for a new one.
                None => {
                    state.phase = LoginPhase::AwaitingMessage;
                    ReadyDecision::Defer
                }
            },
            LoginPhase::New => {
                state.phase = LoginPhase::AwaitingMessage;
                ReadyDecision::Defer
            }
            LoginPhase::AwaitingMessage => ReadyDecision::Defer,
            LoginPhase::Reconciling | LoginPhase::Blocked => ReadyDecision::Duplicate,
        }
    }

    /// Like [`mark_joined`](Self::mark_joined), but only while
    /// `generation` still names the player's connection.
    pub fn mark_joined_if_current(
        &mut self,
        player: &Player,
        generation: u64,
    ) -> Option<ReadyDecision> {
        if !self.is_current(player, generation) {
            return None;
        }
        Some(self.mark_joined(player))
    }

    /// Whether a reconciler currently owns this player's connection.
    pub fn is_reconciling(&self, player: &Player) -> bool {
        self.current(player)
            .is_some_and(|s| s.phase == LoginPhase::Reconciling)
    }

    /// Marks the reconciliation for this player as finished. The
    /// connection is blocked whether or not the bypass succeeded.
    ///
    /// Returns `false` if the connection is gone or was reset by a
    /// reconnect in the meantime; nothing is blocked then.
    pub fn finish_reconcile(&mut self, player: &Player) -> bool {
        let state = self
            .connections
            .get_mut(&player.id)
            .filter(|c| c.address == player.address);
        match state {
            Some(state) if state.phase == LoginPhase::Reconciling => {
                state.phase = LoginPhase::Blocked;
                true
            }
            _ => {
                tracing::debug!(%player, "reconcile finished after disconnect");
                false
            }
        }
    }

    /// Whether the player's connection carries the blocked tag.
    pub fn is_blocked(&self, player_id: &PlayerId) -> bool {
        self.connections
            .get(player_id)
            .is_some_and(|s| s.phase == LoginPhase::Blocked)
    }

    /// Drops a stale blocked tag. Called when a new connection for the
    /// player is accepted, before any proxy message can arrive for it.
    pub fn clear_block(&mut self, player_id: &PlayerId) {
        if let Some(state) = self.connections.get_mut(player_id) {
            if state.phase == LoginPhase::Blocked {
                state.phase = LoginPhase::New;
            }
        }
    }

    /// Looks up the login session stored for an address.
    pub fn session(&self, address: &SocketAddr) -> Option<&LoginSession> {
        self.sessions.get(address)
    }

    /// Returns a snapshot of the player's login state.
    pub fn snapshot(&self, player: &Player) -> ConnectionSnapshot {
        let has_session = self.sessions.contains_key(&player.address);
        match self.current(player) {
            Some(state) => ConnectionSnapshot {
                phase: state.phase,
                joined: state.joined,
                has_session,
            },
            None => ConnectionSnapshot {
                has_session,
                ..ConnectionSnapshot::default()
            },
        }
    }

    /// Removes the session, join flag and blocked tag for a player.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&mut self, player: &Player) -> bool {
        let mut had_session = self.sessions.remove(&player.address).is_some();
        let had_state = match self.connections.remove(&player.id) {
            Some(state) => {
                had_session |= self.sessions.remove(&state.address).is_some();
                true
            }
            None => false,
        };
        had_session || had_state
    }

    /// Number of stored login sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no connection has any state.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.connections.is_empty()
    }
}

/// Returns the player's current connection, creating it if needed.
///
/// A tracked connection from a different address belongs to an earlier
/// connection whose quit never arrived; it is replaced, along with its
/// session. Takes the fields separately so the returned borrow covers
/// only `connections`.
fn connection_mut<'a>(
    connections: &'a mut HashMap<PlayerId, ConnectionState>,
    sessions: &mut HashMap<SocketAddr, LoginSession>,
    generation: &mut u64,
    player: &Player,
) -> &'a mut ConnectionState {
    let replaced = connections
        .get(&player.id)
        .is_some_and(|c| c.address != player.address);
    if replaced {
        if let Some(old) = connections.remove(&player.id) {
            sessions.remove(&old.address);
            tracing::debug!(%player, old_address = %old.address, "replacing stale connection");
        }
    }

    connections.entry(player.id).or_insert_with(|| {
        *generation += 1;
        ConnectionState::new(player.address, *generation)
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `LoginStore`.
    //!
    //! Naming follows `test_{function}_{scenario}_{expected}`. The two
    //! race orderings are covered separately; each must yield exactly one
    //! `Schedule`.

    use super::*;
    use uuid::Uuid;

    fn player(n: u8) -> Player {
        Player::new(
            PlayerId(Uuid::from_u128(n as u128)),
            format!("player{n}"),
            SocketAddr::from(([10, 0, 0, n], 25565)),
        )
    }

    fn proxy_session(p: &Player) -> LoginSession {
        LoginSession::login(p.name.clone()).verified()
    }

    fn schedules(decisions: &[ReadyDecision]) -> usize {
        decisions
            .iter()
            .filter(|d| matches!(d, ReadyDecision::Schedule(_)))
            .count()
    }

    // =====================================================================
    // store_session() / mark_joined() race
    // =====================================================================

    #[test]
    fn test_store_session_before_join_defers_then_join_schedules() {
        let mut store = LoginStore::new();
        let p = player(1);

        let first = store.store_session(&p, proxy_session(&p));
        let second = store.mark_joined(&p);

        assert_eq!(first, ReadyDecision::Defer);
        assert_eq!(second, ReadyDecision::Schedule(proxy_session(&p)));
        assert_eq!(store.snapshot(&p).phase, LoginPhase::Reconciling);
    }

    #[test]
    fn test_join_before_store_session_message_schedules() {
        let mut store = LoginStore::new();
        let p = player(1);

        let first = store.mark_joined(&p);
        let second = store.store_session(&p, proxy_session(&p));

        assert_eq!(first, ReadyDecision::Defer);
        assert_eq!(second, ReadyDecision::Schedule(proxy_session(&p)));
    }

    #[test]
    fn test_two_sessions_after_join_schedule_once() {
        let mut store = LoginStore::new();
        let p = player(1);

        let decisions = [
            store.mark_joined(&p),
            store.store_session(&p, proxy_session(&p)),
            store.store_session(&p, proxy_session(&p)),
        ];

        assert_eq!(schedules(&decisions), 1);
        assert_eq!(decisions[2], ReadyDecision::Duplicate);
    }

    #[test]
    fn test_two_sessions_before_join_schedule_once() {
        let mut store = LoginStore::new();
        let p = player(1);

        let decisions = [
            store.store_session(&p, proxy_session(&p)),
            store.store_session(&p, LoginSession::registration(p.name.clone()).verified()),
            store.mark_joined(&p),
        ];

        assert_eq!(schedules(&decisions), 1);
        // The later session replaced the earlier one while still waiting.
        match &decisions[2] {
            ReadyDecision::Schedule(session) => assert!(session.registered),
            other => panic!("expected Schedule, got {other:?}"),
        }
    }

    #[test]
    fn test_mark_joined_twice_keeps_flag_and_never_schedules_without_session() {
        let mut store = LoginStore::new();
        let p = player(1);

        assert_eq!(store.mark_joined(&p), ReadyDecision::Defer);
        assert_eq!(store.mark_joined(&p), ReadyDecision::Defer);

        let snap = store.snapshot(&p);
        assert!(snap.joined);
        assert!(!snap.has_session);
        assert_eq!(snap.phase, LoginPhase::AwaitingMessage);
    }

    #[test]
    fn test_connections_are_independent() {
        let mut store = LoginStore::new();
        let (a, b) = (player(1), player(2));

        store.mark_joined(&a);
        let decision = store.store_session(&b, proxy_session(&b));

        assert_eq!(decision, ReadyDecision::Defer);
        assert!(!store.snapshot(&b).joined);
    }

    // =====================================================================
    // track() / generations
    // =====================================================================

    fn moved(p: &Player, port: u16) -> Player {
        Player::new(p.id, p.name.clone(), SocketAddr::new(p.address.ip(), port))
    }

    #[test]
    fn test_track_same_connection_keeps_generation_and_state() {
        let mut store = LoginStore::new();
        let p = player(1);
        let generation = store.track(&p);
        store.store_session(&p, proxy_session(&p));

        assert_eq!(store.track(&p), generation);
        assert_eq!(store.snapshot(&p).phase, LoginPhase::AwaitingJoin);
    }

    #[test]
    fn test_track_after_remove_hands_out_new_generation() {
        let mut store = LoginStore::new();
        let p = player(1);
        let first = store.track(&p);
        store.remove(&p);

        let second = store.track(&p);

        assert_ne!(first, second);
        assert!(!store.is_current(&p, first));
        assert!(store.is_current(&p, second));
    }

    #[test]
    fn test_track_new_address_replaces_stale_connection_and_session() {
        let mut store = LoginStore::new();
        let old = player(1);
        let new = moved(&old, 25566);
        let first = store.track(&old);
        store.store_session(&old, proxy_session(&old));

        let second = store.track(&new);

        assert_ne!(first, second);
        assert!(store.session(&old.address).is_none());
        assert_eq!(store.snapshot(&new).phase, LoginPhase::New);
    }

    #[test]
    fn test_store_session_if_current_untracked_returns_none() {
        let mut store = LoginStore::new();
        let p = player(1);

        assert_eq!(store.store_session_if_current(&p, 1, proxy_session(&p)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_session_if_current_after_join_schedules() {
        let mut store = LoginStore::new();
        let p = player(1);
        let generation = store.track(&p);
        store.mark_joined(&p);

        let decision = store.store_session_if_current(&p, generation, proxy_session(&p));

        assert!(matches!(decision, Some(ReadyDecision::Schedule(_))));
    }

    #[test]
    fn test_store_session_if_current_after_reconnect_returns_none() {
        // Same identity and address, but a new connection.
        let mut store = LoginStore::new();
        let p = player(1);
        let stale = store.track(&p);
        store.remove(&p);
        store.track(&p);

        let decision = store.store_session_if_current(&p, stale, proxy_session(&p));

        assert_eq!(decision, None);
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.snapshot(&p).phase, LoginPhase::New);
    }

    #[test]
    fn test_store_session_if_current_old_address_stores_nothing() {
        let mut store = LoginStore::new();
        let old = player(1);
        let new = moved(&old, 25566);
        let stale = store.track(&old);
        store.remove(&old);
        store.track(&new);

        let decision = store.store_session_if_current(&old, stale, proxy_session(&old));

        assert_eq!(decision, None);
        assert!(store.session(&old.address).is_none());
        store.remove(&new);
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_joined_if_current_stale_generation_leaves_new_connection_alone() {
        let mut store = LoginStore::new();
        let old = player(1);
        let new = moved(&old, 25566);
        let stale = store.track(&old);
        store.remove(&old);
        store.track(&new);
        store.store_session(&new, proxy_session(&new));

        assert_eq!(store.mark_joined_if_current(&old, stale), None);

        let snap = store.snapshot(&new);
        assert_eq!(snap.phase, LoginPhase::AwaitingJoin);
        assert!(!snap.joined);
        assert!(matches!(store.mark_joined(&new), ReadyDecision::Schedule(_)));
    }

    #[test]
    fn test_remove_clears_session_under_tracked_address() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.store_session(&p, proxy_session(&p));

        // Quit reported with a different address than the connection had.
        assert!(store.remove(&moved(&p, 1)));

        assert!(store.is_empty());
    }

    #[test]
    fn test_is_reconciling_other_address_is_false() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));

        assert!(store.is_reconciling(&p));
        assert!(!store.is_reconciling(&moved(&p, 1)));
    }

    // =====================================================================
    // finish_reconcile() / is_blocked() / clear_block()
    // =====================================================================

    #[test]
    fn test_finish_reconcile_blocks_and_rejects_later_sessions() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));

        assert!(store.is_reconciling(&p));
        assert!(store.finish_reconcile(&p));

        assert!(store.is_blocked(&p.id));
        assert!(!store.is_reconciling(&p));
        assert_eq!(
            store.store_session(&p, proxy_session(&p)),
            ReadyDecision::Duplicate
        );
        assert_eq!(store.mark_joined(&p), ReadyDecision::Duplicate);
    }

    #[test]
    fn test_finish_reconcile_after_remove_leaves_no_state() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));
        store.remove(&p);

        assert!(!store.finish_reconcile(&p));

        assert!(store.is_empty());
        assert!(!store.is_blocked(&p.id));
    }

    #[test]
    fn test_finish_reconcile_after_reconnect_does_not_block_new_connection() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));
        store.remove(&p);
        store.store_session(&p, proxy_session(&p));

        assert!(!store.finish_reconcile(&p));
        assert_eq!(store.snapshot(&p).phase, LoginPhase::AwaitingJoin);
    }

    #[test]
    fn test_clear_block_resets_blocked_connection() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));
        store.finish_reconcile(&p);

        store.clear_block(&p.id);

        assert!(!store.is_blocked(&p.id));
        assert_eq!(store.snapshot(&p).phase, LoginPhase::New);
    }

    #[test]
    fn test_clear_block_leaves_reconciling_alone() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));

        store.clear_block(&p.id);

        assert_eq!(store.snapshot(&p).phase, LoginPhase::Reconciling);
    }

    // =====================================================================
    // remove()
    // =====================================================================

    #[test]
    fn test_remove_clears_session_flag_and_block() {
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));
        store.finish_reconcile(&p);

        assert!(store.remove(&p));

        assert!(store.session(&p.address).is_none());
        assert_eq!(store.snapshot(&p), ConnectionSnapshot::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_unknown_player_returns_false() {
        let mut store = LoginStore::new();
        assert!(!store.remove(&player(9)));
    }

    #[test]
    fn test_remove_then_reconnect_starts_fresh() {
        // Addresses and identities are reused across reconnects.
        let mut store = LoginStore::new();
        let p = player(1);
        store.mark_joined(&p);
        store.store_session(&p, proxy_session(&p));
        store.finish_reconcile(&p);
        store.remove(&p);

        assert_eq!(
            store.store_session(&p, proxy_session(&p)),
            ReadyDecision::Defer
        );
        assert!(matches!(store.mark_joined(&p), ReadyDecision::Schedule(_)));
    }

    #[test]
    fn test_session_count_tracks_stored_sessions() {
        let mut store = LoginStore::new();
        assert_eq!(store.session_count(), 0);

        store.store_session(&player(1), proxy_session(&player(1)));
        store.store_session(&player(2), proxy_session(&player(2)));

        assert_eq!(store.session_count(), 2);
    }
}
