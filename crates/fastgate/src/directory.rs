//! Players currently connected to this backend.
//!
//! Maintained by the main loop from the host's lifecycle events and used
//! to resolve the target of a login action by name. Only the main loop
//! touches it, so it needs no lock.

use std::collections::HashMap;

use fastgate_protocol::PlayerId;
use fastgate_session::Player;

#[derive(Debug, Default)]
pub(crate) struct OnlinePlayers {
    by_id: HashMap<PlayerId, Player>,
    /// Lowercased name → id. Game names are unique ignoring case.
    by_name: HashMap<String, PlayerId>,
}

impl OnlinePlayers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a connection, replacing any earlier record for the same
    /// player.
    pub(crate) fn insert(&mut self, player: Player) {
        if let Some(old) = self.by_id.remove(&player.id) {
            self.by_name.remove(&old.name.to_lowercase());
        }
        self.by_name.insert(player.name.to_lowercase(), player.id);
        self.by_id.insert(player.id, player);
    }

    pub(crate) fn remove(&mut self, player_id: &PlayerId) -> Option<Player> {
        let player = self.by_id.remove(player_id)?;
        self.by_name.remove(&player.name.to_lowercase());
        Some(player)
    }

    pub(crate) fn contains(&self, player_id: &PlayerId) -> bool {
        self.by_id.contains_key(player_id)
    }

    /// Finds a player by full name. No prefix matching.
    pub(crate) fn find_exact(&self, name: &str) -> Option<&Player> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use uuid::Uuid;

    fn player(name: &str, n: u8) -> Player {
        Player::new(
            PlayerId(Uuid::from_u128(n as u128)),
            name,
            SocketAddr::from(([127, 0, 0, n], 40000)),
        )
    }

    #[test]
    fn test_find_exact_ignores_case_but_not_prefix() {
        let mut online = OnlinePlayers::new();
        online.insert(player("Alice", 1));

        assert_eq!(online.find_exact("alice").map(|p| p.id), Some(player("Alice", 1).id));
        assert!(online.find_exact("Ali").is_none());
    }

    #[test]
    fn test_remove_drops_name_index() {
        let mut online = OnlinePlayers::new();
        let alice = player("Alice", 1);
        online.insert(alice.clone());

        assert_eq!(online.remove(&alice.id), Some(alice.clone()));
        assert!(online.find_exact("Alice").is_none());
        assert!(!online.contains(&alice.id));
        assert_eq!(online.len(), 0);
    }

    #[test]
    fn test_insert_same_player_renamed_replaces_index() {
        let mut online = OnlinePlayers::new();
        online.insert(player("Alice", 1));
        online.insert(player("Alicia", 1));

        assert!(online.find_exact("Alice").is_none());
        assert!(online.find_exact("Alicia").is_some());
        assert_eq!(online.len(), 1);
    }
}
