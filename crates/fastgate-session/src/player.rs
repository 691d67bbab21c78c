//! The backend's view of a connected player.

use std::fmt;
use std::net::SocketAddr;

use fastgate_protocol::PlayerId;

/// A player connection as reported by the host server's lifecycle events.
///
/// Cheap to clone; handlers pass it into background tasks by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Player {
    /// Stable account identity.
    pub id: PlayerId,
    /// Exact in-game name.
    pub name: String,
    /// Remote address of the connection. Keys the login session because
    /// it is known before the server has built its own player object.
    pub address: SocketAddr,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, address: SocketAddr) -> Self {
        Self {
            id,
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
