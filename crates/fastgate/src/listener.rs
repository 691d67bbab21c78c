//! Message listener: inbound login actions from the proxy.
//!
//! The flow for one message:
//!   1. Decode the payload (drop on failure)
//!   2. Resolve the target player: the carrier if the names match, else
//!      a connected player with that exact name
//!   3. Reject if the target is blocked
//!   4. Reject if the proxy id isn't allow-listed
//!   5. Dispatch on the action type
//!
//! Target resolution trusts the proxy-supplied name for routing once the
//! proxy itself is trusted. Some proxies deliver on whichever connection
//! is handy rather than the subject's own.

use std::sync::Arc;

use fastgate_protocol::{ActionType, Codec, LoginActionMessage};
use fastgate_session::{LoginSession, Player, PremiumStatus, ReadyDecision};

use crate::reconciler;
use crate::server::{GateLoop, GateState};
use crate::GateError;

impl<C: Codec> GateLoop<C> {
    /// Handles one payload from the force channel.
    pub(crate) async fn on_plugin_message(
        &mut self,
        carrier: &Player,
        payload: &[u8],
    ) -> Result<(), GateError> {
        let message = self.state.codec.decode(payload)?;
        tracing::debug!(%message, %carrier, "received login action");

        let target = self.resolve_target(carrier, &message)?;

        if self.state.logins.lock().await.is_blocked(&target.id) {
            return Err(GateError::BlockedTarget(target.name));
        }
        if !self.state.trust.is_trusted(&message.proxy_id) {
            return Err(GateError::UntrustedSender(message.proxy_id));
        }

        tracing::info!(
            action = %message.action,
            player = %target,
            proxy_id = %message.proxy_id,
            "login action from proxy"
        );

        match message.action {
            ActionType::Login => {
                // The proxy did the verification; its word is enough once
                // the sender is trusted.
                let session = LoginSession::login(message.player_name).verified();
                self.start_login_task_if_ready(&target, session).await;
            }
            ActionType::Register => {
                let generation = {
                    let mut logins = self.state.logins.lock().await;
                    if logins.is_reconciling(&target) {
                        tracing::debug!(player = %target, "force login already in progress, skipping REGISTER");
                        return Ok(());
                    }
                    logins.track(&target)
                };
                self.check_registration(target, generation, message.player_name);
            }
            ActionType::Cracked => {
                // No reconciler: cracked players authenticate normally.
                self.state.premium.set(target.id, PremiumStatus::Cracked).await;
            }
        }
        Ok(())
    }

    fn resolve_target(
        &self,
        carrier: &Player,
        message: &LoginActionMessage,
    ) -> Result<Player, GateError> {
        if message.player_name == carrier.name {
            return Ok(carrier.clone());
        }

        match self.online.find_exact(&message.player_name) {
            Some(target) => {
                tracing::debug!(
                    %carrier,
                    target_player = %target,
                    "login action redirected by name"
                );
                Ok(target.clone())
            }
            None => Err(GateError::TargetNotFound(message.player_name.clone())),
        }
    }

    /// Asks the auth plugin whether `player_name` already has an account,
    /// off the main loop. If it doesn't, the task stores a registration
    /// session itself, provided `generation` still names the target's
    /// connection by then.
    fn check_registration(&self, target: Player, generation: u64, player_name: String) {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let registered = match state.auth.clone() {
                // Nothing to ask: the name is free as far as we know.
                None => Ok(false),
                Some(plugin) => {
                    let name = player_name.clone();
                    match tokio::task::spawn_blocking(move || plugin.is_registered(&name)).await {
                        Ok(result) => result.map_err(GateError::CollaboratorQuery),
                        Err(e) => {
                            tracing::error!(player = %target, error = %e, "registration check panicked");
                            return;
                        }
                    }
                }
            };

            match registered {
                Ok(false) => {
                    let session = LoginSession::registration(player_name).verified();
                    let decision = state
                        .logins
                        .lock()
                        .await
                        .store_session_if_current(&target, generation, session);
                    match decision {
                        Some(decision) => act_on(&state, &target, decision),
                        None => tracing::debug!(
                            player = %target,
                            "connection closed or replaced during registration check"
                        ),
                    }
                }
                Ok(true) => {
                    tracing::info!(player = %target, "name already registered, ignoring REGISTER");
                }
                Err(e) => {
                    tracing::error!(
                        player = %target,
                        name = %player_name,
                        error = %e,
                        "failed to query isRegistered, falling back to normal authentication"
                    );
                }
            }
        });
    }

    /// Stores the session and schedules the reconciler if the join event
    /// already fired. Otherwise the join handler will schedule it.
    pub(crate) async fn start_login_task_if_ready(&self, player: &Player, session: LoginSession) {
        let decision = self.state.logins.lock().await.store_session(player, session);
        act_on(&self.state, player, decision);
    }
}

/// Acts on the message side of the join/message race.
fn act_on<C: Codec>(state: &Arc<GateState<C>>, player: &Player, decision: ReadyDecision) {
    match decision {
        ReadyDecision::Schedule(session) => {
            tracing::info!(%player, "join event already fired, starting force login");
            reconciler::spawn(Arc::clone(state), player.clone(), session);
        }
        ReadyDecision::Defer => {
            tracing::info!(%player, "delaying force login until join event fires");
        }
        ReadyDecision::Duplicate => {
            tracing::debug!(%player, "force login already in progress");
        }
    }
}
