//! Last-known premium status per player.
//!
//! Downstream consumers (auth-plugin glue, commands) ask this cache
//! whether a player was verified upstream. It is keyed by [`PlayerId`]
//! rather than address so it can be queried without knowing the
//! connection.

use std::collections::HashMap;
use std::fmt;

use fastgate_protocol::PlayerId;
use tokio::sync::RwLock;

/// Verification outcome for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PremiumStatus {
    /// Verified upstream; allowed to skip password authentication.
    Premium,
    /// Not verified; must authenticate locally.
    Cracked,
    /// No determination has been made.
    Unknown,
}

impl PremiumStatus {
    /// Maps a session's `verified` flag to a status.
    pub fn from_verified(verified: bool) -> Self {
        if verified { Self::Premium } else { Self::Cracked }
    }
}

impl fmt::Display for PremiumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Premium => "PREMIUM",
            Self::Cracked => "CRACKED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Concurrent player → status map. Last writer wins.
#[derive(Debug, Default)]
pub struct PremiumStatusCache {
    entries: RwLock<HashMap<PlayerId, PremiumStatus>>,
}

impl PremiumStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a determination, replacing any previous one.
    pub async fn set(&self, player_id: PlayerId, status: PremiumStatus) {
        self.entries.write().await.insert(player_id, status);
    }

    /// Returns the cached entry, if any.
    pub async fn get(&self, player_id: &PlayerId) -> Option<PremiumStatus> {
        self.entries.read().await.get(player_id).copied()
    }

    /// Returns the cached status, or [`PremiumStatus::Unknown`].
    pub async fn status(&self, player_id: &PlayerId) -> PremiumStatus {
        self.get(player_id).await.unwrap_or(PremiumStatus::Unknown)
    }

    /// Drops the entry so it can't leak into the player's next session.
    pub async fn remove(&self, player_id: &PlayerId) -> Option<PremiumStatus> {
        self.entries.write().await.remove(player_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn pid(n: u128) -> PlayerId {
        PlayerId(Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn test_status_of_unknown_player_is_unknown() {
        let cache = PremiumStatusCache::new();
        assert_eq!(cache.status(&pid(1)).await, PremiumStatus::Unknown);
        assert_eq!(cache.get(&pid(1)).await, None);
    }

    #[tokio::test]
    async fn test_set_last_writer_wins() {
        let cache = PremiumStatusCache::new();
        cache.set(pid(1), PremiumStatus::Cracked).await;
        cache.set(pid(1), PremiumStatus::Premium).await;

        assert_eq!(cache.status(&pid(1)).await, PremiumStatus::Premium);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_returns_previous_and_empties() {
        let cache = PremiumStatusCache::new();
        cache.set(pid(1), PremiumStatus::Premium).await;

        assert_eq!(cache.remove(&pid(1)).await, Some(PremiumStatus::Premium));
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_from_verified_maps_flag() {
        assert_eq!(PremiumStatus::from_verified(true), PremiumStatus::Premium);
        assert_eq!(PremiumStatus::from_verified(false), PremiumStatus::Cracked);
    }
}
