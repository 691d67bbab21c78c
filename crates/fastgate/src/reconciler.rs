//! Force-login reconciler: the one-shot task that turns a ready session
//! into an authenticated player.
//!
//! Runs at most once per connection. The login store hands out exactly
//! one `ReadyDecision::Schedule` per connection, and only the holder of
//! that decision calls [`spawn`]. Whatever happens inside, the connection
//! ends up blocked, so later login actions for it are rejected.

use std::sync::Arc;

use fastgate_protocol::Codec;
use fastgate_session::{AuthPlugin, LoginSession, Player, PremiumStatus, SessionError};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::server::GateState;

/// Starts the reconciler for `player` in the background.
pub(crate) fn spawn<C: Codec>(state: Arc<GateState<C>>, player: Player, session: LoginSession) {
    tokio::spawn(async move {
        reconcile(&state, &player, &session).await;

        let still_connected = state.logins.lock().await.finish_reconcile(&player);
        if !still_connected {
            // The quit handler already ran; don't leave a status behind.
            state.premium.remove(&player.id).await;
        }
    });
}

async fn reconcile<C: Codec>(state: &GateState<C>, player: &Player, session: &LoginSession) {
    if !state.logins.lock().await.is_reconciling(player) {
        tracing::debug!(%player, "player left before force login");
        return;
    }

    state
        .premium
        .set(player.id, PremiumStatus::from_verified(session.verified))
        .await;

    if !session.verified {
        tracing::info!(%player, "session not verified, leaving authentication to the player");
        return;
    }

    let Some(plugin) = state.auth.clone() else {
        tracing::warn!(%player, "no auth plugin hooked, cannot force login");
        return;
    };

    let password = session
        .registered
        .then(|| generate_password(state.config.register_password_length));

    let outcome = run_bypass(plugin, player.clone(), password).await;
    match outcome {
        Ok(true) if session.registered => {
            tracing::info!(%player, "force registered premium player");
        }
        Ok(true) => tracing::info!(%player, "force logged in premium player"),
        Ok(false) => tracing::warn!(%player, "auth plugin refused the forced login"),
        Err(e) => tracing::error!(%player, error = %e, "forced login failed"),
    }
}

/// Calls the blocking plugin method on the blocking pool.
async fn run_bypass(
    plugin: Arc<dyn AuthPlugin>,
    player: Player,
    password: Option<String>,
) -> Result<bool, SessionError> {
    let plugin_name = plugin.name().to_string();
    let call = tokio::task::spawn_blocking(move || match password {
        Some(password) => plugin.force_register(&player, &password),
        None => plugin.force_login(&player),
    });

    call.await.map_err(|e| SessionError::AuthPlugin {
        plugin: plugin_name,
        reason: e.to_string(),
    })?
}

/// Random alphanumeric password for an account the player never sees.
fn generate_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
