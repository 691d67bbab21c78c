//! Login state for Fastgate.
//!
//! This crate holds everything the gate knows about players between the
//! proxy's message and the forced login:
//!
//! 1. **Trust**: which proxies may speak at all ([`ProxyTrustStore`])
//! 2. **Session tracking**: in-flight login attempts, join flags and
//!    blocked tags, and the race decision between them ([`LoginStore`])
//! 3. **Status**: last-known premium status per player
//!    ([`PremiumStatusCache`])
//! 4. **Auth plugins**: the password-auth collaborator and how one is
//!    selected at startup ([`AuthPlugin`], [`AuthHookRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gate (above)      ← listener, join handler, reconciler
//!     ↕
//! Session (this crate)  ← login state and trust
//!     ↕
//! Protocol (below)  ← PlayerId, ProxyId
//! ```

mod auth;
mod error;
mod player;
mod premium;
mod session;
mod store;
mod trust;

pub use auth::{AuthHookRegistry, AuthPlugin};
pub use error::SessionError;
pub use player::Player;
pub use premium::{PremiumStatus, PremiumStatusCache};
pub use session::{ConnectionSnapshot, LoginPhase, LoginSession, ReadyDecision};
pub use store::LoginStore;
pub use trust::ProxyTrustStore;
