//! Gate configuration.
//!
//! Sensible defaults are provided for every field; a JSON file only needs
//! the fields it wants to change:
//!
//! ```json
//! {
//!     "proxy_file": "plugins/fastgate/allowed-proxies.txt",
//!     "auth_plugin": "AuthMe",
//!     "settle_delay_ticks": 10
//! }
//! ```

use std::path::{Path, PathBuf};

use fastgate_protocol::FORCE_CHANNEL;
use fastgate_tick::TickConfig;
use serde::Deserialize;

/// Errors while loading a [`GateConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for one gate instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Plugin-message channel login actions arrive on.
    pub channel: String,

    /// The host server's tick rate.
    pub tick_rate_hz: u32,

    /// Ticks to wait after the join event before looking for a session,
    /// so auth plugins can finish their own join handling first.
    pub settle_delay_ticks: u32,

    /// Allowed-proxies file: one proxy UUID per line.
    pub proxy_file: PathBuf,

    /// Auth plugin to prefer when several are installed.
    pub auth_plugin: Option<String>,

    /// Length of generated passwords for forced registrations.
    pub register_password_length: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            channel: FORCE_CHANNEL.to_string(),
            tick_rate_hz: TickConfig::DEFAULT_TICK_RATE_HZ,
            settle_delay_ticks: 10,
            proxy_file: PathBuf::from("allowed-proxies.txt"),
            auth_plugin: None,
            register_password_length: 8,
        }
    }
}

impl GateConfig {
    /// Shortest password the gate will generate.
    pub const MIN_PASSWORD_LENGTH: usize = 4;

    /// Parses a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        self.tick_rate_hz = TickConfig::with_rate(self.tick_rate_hz)
            .validated()
            .tick_rate_hz;
        if self.register_password_length < Self::MIN_PASSWORD_LENGTH {
            tracing::warn!(
                length = self.register_password_length,
                min = Self::MIN_PASSWORD_LENGTH,
                "register_password_length too short, raising"
            );
            self.register_password_length = Self::MIN_PASSWORD_LENGTH;
        }
        self
    }

    pub(crate) fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_server_tick_rate() {
        let config = GateConfig::default();
        assert_eq!(config.tick_rate_hz, 20);
        assert_eq!(config.settle_delay_ticks, 10);
        assert_eq!(config.channel, FORCE_CHANNEL);
    }

    #[test]
    fn test_from_json_str_partial_keeps_defaults() {
        let config =
            GateConfig::from_json_str(r#"{ "auth_plugin": "AuthMe", "settle_delay_ticks": 4 }"#)
                .unwrap();

        assert_eq!(config.auth_plugin.as_deref(), Some("AuthMe"));
        assert_eq!(config.settle_delay_ticks, 4);
        assert_eq!(config.register_password_length, 8);
    }

    #[test]
    fn test_from_json_str_clamps_values() {
        let config =
            GateConfig::from_json_str(r#"{ "tick_rate_hz": 0, "register_password_length": 1 }"#)
                .unwrap();

        assert_eq!(config.tick_rate_hz, 1);
        assert_eq!(config.register_password_length, GateConfig::MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn test_from_json_str_rejects_bad_types() {
        let result = GateConfig::from_json_str(r#"{ "tick_rate_hz": "fast" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_json_file_missing_is_io_error() {
        let result = GateConfig::from_json_file(Path::new("/nonexistent/fastgate.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
