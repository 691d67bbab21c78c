//! Wire protocol for Fastgate.
//!
//! This crate defines the single message a proxy sends to a backend
//! about a joining player, and how it is turned into bytes:
//!
//! - **Types** ([`LoginActionMessage`], [`ActionType`], [`ProxyId`],
//!   [`PlayerId`]): what travels on the force channel.
//! - **Codec** ([`Codec`] trait, [`BinaryCodec`]): the fixed binary
//!   layout.
//! - **Errors** ([`ProtocolError`]): every way a payload can be rejected.
//!
//! The protocol layer doesn't know about players, sessions or trust. It
//! only knows how to read and write the message.
//!
//! ```text
//! Force channel (bytes) → Protocol (LoginActionMessage) → Listener
//! ```

mod codec;
mod error;
mod types;

pub use codec::{BinaryCodec, Codec};
pub use error::ProtocolError;
pub use types::{
    ActionType, LoginActionMessage, PlayerId, ProxyId, FORCE_CHANNEL, MAX_NAME_LEN,
};
