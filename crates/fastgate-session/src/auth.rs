//! Hooks into the server's password-authentication plugin.
//!
//! Fastgate doesn't authenticate players itself. A local auth plugin
//! does (it owns accounts and passwords). What Fastgate needs from it is
//! small, so it is captured in the [`AuthPlugin`] trait:
//!
//! - "is this name registered?" for the REGISTER flow
//! - "log this player in without a password"
//! - "create an account for this player and log them in"
//!
//! Servers can run one of several auth plugins. Which one is active is
//! decided once at startup from an [`AuthHookRegistry`]: a fixed, ordered
//! list of known integrations, each behind a factory.

use std::fmt;
use std::sync::Arc;

use crate::{Player, SessionError};

/// Capability interface of a password-authentication plugin.
///
/// Every method may block (plugins often hit a database), so the gate
/// only calls them from background tasks via `spawn_blocking`, never from
/// its main loop.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared across background tasks.
/// - `'static` → lives as long as the gate.
///
/// # Example
///
/// ```rust
/// use fastgate_session::{AuthPlugin, Player, SessionError};
///
/// /// Treats every name as unregistered and lets every bypass through.
/// struct OpenDoor;
///
/// impl AuthPlugin for OpenDoor {
///     fn name(&self) -> &str {
///         "OpenDoor"
///     }
///
///     fn is_registered(&self, _player_name: &str) -> Result<bool, SessionError> {
///         Ok(false)
///     }
///
///     fn force_login(&self, _player: &Player) -> Result<bool, SessionError> {
///         Ok(true)
///     }
///
///     fn force_register(&self, _player: &Player, _password: &str) -> Result<bool, SessionError> {
///         Ok(true)
///     }
/// }
/// ```
pub trait AuthPlugin: Send + Sync + 'static {
    /// Name used in logs and registry lookups.
    fn name(&self) -> &str;

    /// Whether the plugin already has an account with this name.
    ///
    /// # Errors
    /// [`SessionError::AuthPlugin`] when the plugin can't answer. Callers
    /// must not guess account existence in that case.
    fn is_registered(&self, player_name: &str) -> Result<bool, SessionError>;

    /// Marks the player as authenticated without a password.
    /// Returns `false` if the plugin refused.
    fn force_login(&self, player: &Player) -> Result<bool, SessionError>;

    /// Creates an account with `password` and logs the player in.
    /// Returns `false` if the plugin refused.
    fn force_register(&self, player: &Player, password: &str) -> Result<bool, SessionError>;
}

type Factory = Box<dyn Fn() -> Arc<dyn AuthPlugin> + Send + Sync>;

/// Static registry of known auth-plugin integrations.
///
/// Entries are tried in registration order; the order is the priority.
///
/// ```rust,ignore
/// let registry = AuthHookRegistry::new()
///     .register("AuthMe", || Arc::new(AuthMeHook::new()))
///     .register("LoginSecurity", || Arc::new(LoginSecurityHook::new()));
///
/// let hook = registry.resolve(config.auth_plugin.as_deref(), |name| server.is_enabled(name));
/// ```
#[derive(Default)]
pub struct AuthHookRegistry {
    entries: Vec<(String, Factory)>,
}

impl AuthHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an integration under `name`.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn AuthPlugin> + Send + Sync + 'static,
    {
        self.entries.push((name.into(), Box::new(factory)));
        self
    }

    /// Registered names, in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Picks the plugin to hook into.
    ///
    /// `preferred` wins if it is registered and enabled. Otherwise the
    /// first enabled entry is used. `None` if nothing is enabled.
    pub fn resolve(
        &self,
        preferred: Option<&str>,
        is_enabled: impl Fn(&str) -> bool,
    ) -> Option<Arc<dyn AuthPlugin>> {
        let preferred_entry = preferred.and_then(|wanted| {
            self.entries
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(wanted) && is_enabled(name))
        });

        if preferred.is_some() && preferred_entry.is_none() {
            tracing::warn!(
                preferred = preferred.unwrap_or_default(),
                "preferred auth plugin not available, falling back to detection"
            );
        }

        let found = preferred_entry.or_else(|| self.entries.iter().find(|(name, _)| is_enabled(name)));

        match found {
            Some((name, factory)) => {
                tracing::info!(plugin = %name, "hooking into auth plugin");
                Some(factory())
            }
            None => {
                tracing::warn!(
                    known = self.entries.len(),
                    "no supported auth plugin enabled, only proxy attestations can be honoured"
                );
                None
            }
        }
    }
}

impl fmt::Debug for AuthHookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl AuthPlugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn is_registered(&self, _: &str) -> Result<bool, SessionError> {
            Ok(false)
        }

        fn force_login(&self, _: &Player) -> Result<bool, SessionError> {
            Ok(true)
        }

        fn force_register(&self, _: &Player, _: &str) -> Result<bool, SessionError> {
            Ok(true)
        }
    }

    fn registry() -> AuthHookRegistry {
        AuthHookRegistry::new()
            .register("AuthMe", || Arc::new(Named("AuthMe")))
            .register("LogIt", || Arc::new(Named("LogIt")))
            .register("xAuth", || Arc::new(Named("xAuth")))
    }

    #[test]
    fn test_resolve_picks_first_enabled_in_order() {
        let hook = registry().resolve(None, |name| name != "AuthMe").unwrap();
        assert_eq!(hook.name(), "LogIt");
    }

    #[test]
    fn test_resolve_prefers_configured_plugin() {
        let hook = registry().resolve(Some("xauth"), |_| true).unwrap();
        assert_eq!(hook.name(), "xAuth");
    }

    #[test]
    fn test_resolve_disabled_preference_falls_back() {
        let hook = registry().resolve(Some("xAuth"), |name| name == "AuthMe").unwrap();
        assert_eq!(hook.name(), "AuthMe");
    }

    #[test]
    fn test_resolve_nothing_enabled_is_none() {
        assert!(registry().resolve(None, |_| false).is_none());
    }

    #[test]
    fn test_names_keep_registration_order() {
        let names: Vec<_> = registry().names().map(str::to_owned).collect();
        assert_eq!(names, ["AuthMe", "LogIt", "xAuth"]);
    }
}
