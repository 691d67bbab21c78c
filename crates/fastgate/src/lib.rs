//! # Fastgate
//!
//! Forced login for game backends behind a verifying proxy.
//!
//! The proxy checks a player's premium account and tells the backend over
//! a plugin-message channel. Fastgate listens on that channel, checks the
//! message came through a trusted proxy, waits until the server's own
//! join handling has settled, and then asks the local auth plugin to log
//! the player in (or register them) without a password.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fastgate::prelude::*;
//!
//! # async fn start(registry: AuthHookRegistry) -> Result<(), GateError> {
//! let gate = GateBuilder::new()
//!     .config(GateConfig::default())
//!     .auth_registry(registry, |_name| true)
//!     .build()?;
//! let handle = gate.handle();
//! tokio::spawn(gate.run());
//!
//! // Forward the host's events:
//! // handle.player_login(player).await?;
//! // handle.plugin_message(channel, carrier, bytes).await?;
//! // handle.player_join(player).await?;
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

mod config;
mod directory;
mod error;
mod lifecycle;
mod listener;
mod reconciler;
mod server;

pub use config::{ConfigError, GateConfig};
pub use error::GateError;
pub use server::{Gate, GateBuilder, GateHandle};

pub use fastgate_protocol as protocol;
pub use fastgate_session as session;

pub mod prelude {
    pub use crate::{Gate, GateBuilder, GateConfig, GateError, GateHandle};
    pub use fastgate_protocol::{
        ActionType, BinaryCodec, Codec, LoginActionMessage, PlayerId, ProxyId, FORCE_CHANNEL,
    };
    pub use fastgate_session::{
        AuthHookRegistry, AuthPlugin, ConnectionSnapshot, LoginPhase, LoginSession, Player,
        PremiumStatus, ProxyTrustStore, SessionError,
    };
}
