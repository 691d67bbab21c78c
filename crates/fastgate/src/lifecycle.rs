//! Join-event tracker: the host's connection lifecycle.
//!
//! ```text
//!   login ──→ join ──(settle delay)──→ join settled ──→ [reconciler?]
//!     │                                                      │
//!     └──────────────────────── quit ◄───────────────────────┘
//! ```
//!
//! The join handler doesn't act immediately. Other plugins finish their
//! own join handling first, so the readiness check runs a fixed number
//! of ticks later.

use std::sync::Arc;

use fastgate_protocol::Codec;
use fastgate_session::{Player, ReadyDecision};

use crate::reconciler;
use crate::server::{DelayedTask, GateLoop};

impl<C: Codec> GateLoop<C> {
    /// A new connection was accepted. Any blocked tag left from an
    /// earlier connection of the same player is dropped here, before a
    /// proxy message for this connection can arrive.
    pub(crate) async fn on_login(&mut self, player: Player) {
        {
            let mut logins = self.state.logins.lock().await;
            logins.track(&player);
            logins.clear_block(&player.id);
        }
        tracing::debug!(%player, "connection accepted");
        self.online.insert(player);
    }

    /// The server's join event fired. Schedules the readiness check after
    /// the settle delay.
    pub(crate) async fn on_join(&mut self, player: Player) {
        let generation = self.state.logins.lock().await.track(&player);
        if !self.online.contains(&player.id) {
            // Hosts that don't report logins still get name resolution.
            self.online.insert(player.clone());
        }

        let delay = self.state.config.settle_delay_ticks;
        tracing::debug!(%player, generation, delay_ticks = delay, "join event, waiting to settle");
        self.delayed.schedule(
            self.ticks.tick_count(),
            u64::from(delay),
            DelayedTask::JoinSettled { player, generation },
        );
    }

    /// Runs once the settle delay has passed. A quit, or a quit and
    /// reconnect, in the meantime makes `generation` stale and the join is
    /// dropped; the new connection settles on its own join.
    pub(crate) async fn on_join_settled(&mut self, player: Player, generation: u64) {
        let decision = self
            .state
            .logins
            .lock()
            .await
            .mark_joined_if_current(&player, generation);
        let Some(decision) = decision else {
            tracing::debug!(%player, generation, "connection gone before join settled");
            return;
        };

        match decision {
            ReadyDecision::Schedule(session) => {
                tracing::info!(%player, "login session already stored, starting force login");
                reconciler::spawn(Arc::clone(&self.state), player, session);
            }
            ReadyDecision::Defer => {
                tracing::debug!(%player, "joined, waiting for login action");
            }
            ReadyDecision::Duplicate => {
                tracing::debug!(%player, "joined, connection already finalizing");
            }
        }
    }

    /// The connection closed. Drops every piece of state for it.
    pub(crate) async fn on_quit(&mut self, player: Player) {
        let had_login_state = self.state.logins.lock().await.remove(&player);
        self.state.premium.remove(&player.id).await;
        self.online.remove(&player.id);

        tracing::debug!(%player, had_login_state, "connection closed");
    }
}
