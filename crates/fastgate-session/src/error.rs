//! Error types for the session layer.

/// Errors raised while loading trust material or talking to an
/// auth-plugin collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A line in the allowed-proxies file isn't a UUID.
    #[error("invalid proxy id {value:?} on line {line}")]
    InvalidProxyId {
        /// 1-based line number in the file.
        line: usize,
        /// The offending text, trimmed.
        value: String,
    },

    /// The allowed-proxies file exists but couldn't be read.
    #[error("failed to read proxy file: {0}")]
    Io(#[from] std::io::Error),

    /// An auth-plugin call failed. The plugin's own error is flattened
    /// into the message because plugins are free to use any error type.
    #[error("auth plugin {plugin} failed: {reason}")]
    AuthPlugin {
        /// Registry name of the plugin.
        plugin: String,
        /// What went wrong.
        reason: String,
    },
}
