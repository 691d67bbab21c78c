//! Unified error type for the gate.
//!
//! Every rejection the listener can produce is a variant here, so the
//! main loop has one place that decides how loudly to log it. None of
//! them is fatal: a rejected message leaves the player on normal
//! password authentication.

use fastgate_protocol::{ProtocolError, ProxyId};
use fastgate_session::SessionError;

use crate::config::ConfigError;

/// Top-level error that wraps the crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The payload didn't decode. Dropped, never retried.
    #[error("malformed login action: {0}")]
    Decode(#[from] ProtocolError),

    /// The message names a proxy that isn't in the allow-list.
    #[error("proxy {0} is not in the allowed proxies")]
    UntrustedSender(ProxyId),

    /// No connected player has the name the message is about.
    #[error("force action target {0} not found")]
    TargetNotFound(String),

    /// The target connection was already finalized.
    #[error("player {0} is blocked for further login actions")]
    BlockedTarget(String),

    /// The auth plugin couldn't answer or failed the bypass.
    #[error("auth plugin query failed: {0}")]
    CollaboratorQuery(SessionError),

    /// Loading trust material failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Loading configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The gate's main loop has stopped.
    #[error("gate is shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error_is_decode() {
        let err: GateError = ProtocolError::UnknownAction(9).into();
        assert!(matches!(err, GateError::Decode(_)));
        assert!(err.to_string().contains("unknown action type 9"));
    }

    #[test]
    fn test_from_session_error_is_session() {
        let err: GateError = SessionError::InvalidProxyId {
            line: 3,
            value: "x".into(),
        }
        .into();
        assert!(matches!(err, GateError::Session(_)));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_collaborator_query_keeps_plugin_context() {
        let err = GateError::CollaboratorQuery(SessionError::AuthPlugin {
            plugin: "AuthMe".into(),
            reason: "database down".into(),
        });
        let shown = err.to_string();
        assert!(shown.contains("AuthMe"));
        assert!(shown.contains("database down"));
    }
}
