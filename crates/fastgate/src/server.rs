//! `GateBuilder`, the main loop, and the handle the host talks to.
//!
//! The gate runs as one Tokio task standing in for the host server's main
//! thread. Lifecycle events and plugin messages arrive over a channel and
//! are handled one at a time; delayed work runs on tick boundaries.
//! Anything that may block (auth-plugin calls) is pushed to background
//! tasks. Nothing waits for them; they report back only by writing to
//! the shared stores in [`GateState`].

use std::sync::Arc;

use fastgate_protocol::{BinaryCodec, Codec, PlayerId};
use fastgate_session::{
    AuthHookRegistry, AuthPlugin, ConnectionSnapshot, LoginSession, LoginStore, Player,
    PremiumStatus, PremiumStatusCache, ProxyTrustStore,
};
use fastgate_tick::{TaskQueue, TickScheduler};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::config::GateConfig;
use crate::directory::OnlinePlayers;
use crate::GateError;

/// Command channel size. Lifecycle events are small and the loop drains
/// them quickly; senders wait when it fills.
const COMMAND_CHANNEL_SIZE: usize = 256;

/// State shared between the main loop and background tasks.
///
/// Wrapped in `Arc` so reconciler tasks can hold it past the event that
/// spawned them.
pub(crate) struct GateState<C: Codec> {
    pub(crate) config: GateConfig,
    pub(crate) codec: C,
    /// Read-only after build.
    pub(crate) trust: ProxyTrustStore,
    /// Sessions, join flags and blocked tags behind one lock.
    pub(crate) logins: Mutex<LoginStore>,
    pub(crate) premium: Arc<PremiumStatusCache>,
    pub(crate) auth: Option<Arc<dyn AuthPlugin>>,
}

/// Commands sent from [`GateHandle`] to the main loop.
pub(crate) enum GateCommand {
    /// A connection was accepted, before its join event.
    Login(Player),
    /// The server's join event fired.
    Join(Player),
    /// The connection closed.
    Quit(Player),
    /// Bytes arrived on a plugin-message channel, carried by `carrier`.
    PluginMessage {
        channel: String,
        carrier: Player,
        payload: Vec<u8>,
    },
    /// A local premium check produced a session.
    LocalSession {
        player: Player,
        session: LoginSession,
    },
    /// Request a snapshot of a connection's login state.
    Snapshot {
        player: Player,
        reply: oneshot::Sender<ConnectionSnapshot>,
    },
    /// Stop the main loop.
    Shutdown,
}

/// Work the main loop runs on a later tick.
#[derive(Debug)]
pub(crate) enum DelayedTask {
    /// The settle delay after a join event has passed. `generation` is
    /// the connection the join belonged to.
    JoinSettled { player: Player, generation: u64 },
}

/// The main loop. Owns everything only the main thread may touch.
pub(crate) struct GateLoop<C: Codec> {
    pub(crate) state: Arc<GateState<C>>,
    pub(crate) online: OnlinePlayers,
    pub(crate) ticks: TickScheduler,
    pub(crate) delayed: TaskQueue<DelayedTask>,
    pub(crate) receiver: mpsc::Receiver<GateCommand>,
}

impl<C: Codec> GateLoop<C> {
    async fn run(mut self) {
        tracing::info!(
            channel = %self.state.config.channel,
            proxies = self.state.trust.len(),
            auth_plugin = self.state.auth.as_ref().map(|a| a.name()).unwrap_or("none"),
            "gate running"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(GateCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                tick = self.ticks.wait_for_tick() => {
                    for task in self.delayed.drain_due(tick.tick) {
                        self.run_delayed(task).await;
                    }
                }
            }
        }

        tracing::info!(online = self.online.len(), "gate stopped");
    }

    async fn handle_command(&mut self, cmd: GateCommand) {
        match cmd {
            GateCommand::Login(player) => self.on_login(player).await,
            GateCommand::Join(player) => self.on_join(player).await,
            GateCommand::Quit(player) => self.on_quit(player).await,
            GateCommand::PluginMessage {
                channel,
                carrier,
                payload,
            } => {
                if channel != self.state.config.channel {
                    tracing::debug!(%channel, %carrier, "ignoring message on foreign channel");
                    return;
                }
                if let Err(e) = self.on_plugin_message(&carrier, &payload).await {
                    log_rejection(&carrier, &e);
                }
            }
            GateCommand::LocalSession { player, session } => {
                if self.online.contains(&player.id) {
                    self.start_login_task_if_ready(&player, session).await;
                } else {
                    tracing::warn!(%player, "local session for a player that isn't connected");
                }
            }
            GateCommand::Snapshot { player, reply } => {
                let snapshot = self.state.logins.lock().await.snapshot(&player);
                let _ = reply.send(snapshot);
            }
            // Handled in `run`.
            GateCommand::Shutdown => {}
        }
    }

    async fn run_delayed(&mut self, task: DelayedTask) {
        match task {
            DelayedTask::JoinSettled { player, generation } => {
                self.on_join_settled(player, generation).await
            }
        }
    }
}

/// Maps a listener rejection to its log level. Untrusted senders are
/// security-relevant; the rest are routine.
fn log_rejection(carrier: &Player, err: &GateError) {
    match err {
        GateError::UntrustedSender(proxy_id) => tracing::warn!(
            security = true,
            %proxy_id,
            %carrier,
            "received proxy id that isn't in the proxy file"
        ),
        GateError::BlockedTarget(name) => tracing::warn!(
            target_player = %name,
            %carrier,
            "received login action for a blocked player"
        ),
        GateError::TargetNotFound(name) => tracing::warn!(
            target_player = %name,
            "force action player not found"
        ),
        GateError::Decode(e) => tracing::warn!(
            %carrier,
            error = %e,
            "dropping malformed login action"
        ),
        other => tracing::error!(%carrier, error = %other, "login action failed"),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

type EnabledCheck = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Builder for configuring a gate.
///
/// # Example
///
/// ```rust,ignore
/// let gate = GateBuilder::new()
///     .config(GateConfig::from_json_file(path)?)
///     .auth_registry(registry, |name| server.is_plugin_enabled(name))
///     .build()?;
/// let handle = gate.handle();
/// tokio::spawn(gate.run());
/// ```
pub struct GateBuilder {
    config: GateConfig,
    trust: Option<ProxyTrustStore>,
    auth: Option<Arc<dyn AuthPlugin>>,
    registry: Option<(AuthHookRegistry, EnabledCheck)>,
}

impl GateBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: GateConfig::default(),
            trust: None,
            auth: None,
            registry: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: GateConfig) -> Self {
        self.config = config.validated();
        self
    }

    /// Uses this trust store instead of loading `config.proxy_file`.
    pub fn trust_store(mut self, trust: ProxyTrustStore) -> Self {
        self.trust = Some(trust);
        self
    }

    /// Uses this auth plugin directly.
    pub fn auth_plugin(mut self, plugin: Arc<dyn AuthPlugin>) -> Self {
        self.auth = Some(plugin);
        self
    }

    /// Picks the auth plugin from a registry at build time. Ignored when
    /// [`auth_plugin`](Self::auth_plugin) was set.
    pub fn auth_registry<F>(mut self, registry: AuthHookRegistry, is_enabled: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.registry = Some((registry, Box::new(is_enabled)));
        self
    }

    /// Builds a gate with the standard binary codec.
    ///
    /// Loads the proxy trust store before returning, so no message can be
    /// processed against a half-loaded allow-list.
    ///
    /// # Errors
    /// [`GateError::Session`] if the proxy file is malformed or unreadable.
    pub fn build(self) -> Result<Gate<BinaryCodec>, GateError> {
        self.build_with_codec(BinaryCodec)
    }

    /// Builds a gate with a custom codec.
    pub fn build_with_codec<C: Codec>(self, codec: C) -> Result<Gate<C>, GateError> {
        let trust = match self.trust {
            Some(trust) => trust,
            None => ProxyTrustStore::load_file(&self.config.proxy_file)?,
        };
        if trust.is_empty() {
            tracing::warn!("no allowed proxies configured, every login action will be rejected");
        }

        let auth = match (self.auth, self.registry) {
            (Some(auth), _) => Some(auth),
            (None, Some((registry, is_enabled))) => {
                registry.resolve(self.config.auth_plugin.as_deref(), is_enabled)
            }
            (None, None) => None,
        };

        let premium = Arc::new(PremiumStatusCache::new());
        let state = Arc::new(GateState {
            config: self.config,
            codec,
            trust,
            logins: Mutex::new(LoginStore::new()),
            premium: Arc::clone(&premium),
            auth,
        });

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let actor = GateLoop {
            ticks: TickScheduler::new(state.config.tick_config()),
            state,
            online: OnlinePlayers::new(),
            delayed: TaskQueue::new(),
            receiver: rx,
        };

        Ok(Gate {
            handle: GateHandle {
                sender: tx,
                premium,
            },
            actor,
        })
    }
}

impl Default for GateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Gate / GateHandle
// ---------------------------------------------------------------------------

/// A configured gate that hasn't started yet.
///
/// Grab a [`handle`](Self::handle) before calling [`run`](Self::run).
pub struct Gate<C: Codec> {
    handle: GateHandle,
    actor: GateLoop<C>,
}

impl<C: Codec> Gate<C> {
    /// Creates a new builder.
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }

    /// Returns a handle for feeding events into the gate.
    pub fn handle(&self) -> GateHandle {
        self.handle.clone()
    }

    /// Runs the main loop until [`GateHandle::shutdown`] is called or
    /// every handle is dropped.
    pub async fn run(self) {
        // Our own copy would keep the channel open forever.
        drop(self.handle);
        self.actor.run().await;
    }
}

/// Cheap, cloneable entry point into a running gate.
///
/// The host calls these from its own event handlers. Every method only
/// enqueues work, so none of them blocks on auth-plugin calls.
#[derive(Clone)]
pub struct GateHandle {
    sender: mpsc::Sender<GateCommand>,
    premium: Arc<PremiumStatusCache>,
}

impl GateHandle {
    async fn send(&self, cmd: GateCommand) -> Result<(), GateError> {
        self.sender.send(cmd).await.map_err(|_| GateError::Closed)
    }

    /// A connection was accepted (before its join event).
    pub async fn player_login(&self, player: Player) -> Result<(), GateError> {
        self.send(GateCommand::Login(player)).await
    }

    /// The server's join event fired for this connection.
    pub async fn player_join(&self, player: Player) -> Result<(), GateError> {
        self.send(GateCommand::Join(player)).await
    }

    /// The connection closed.
    pub async fn player_quit(&self, player: Player) -> Result<(), GateError> {
        self.send(GateCommand::Quit(player)).await
    }

    /// A plugin message arrived on `channel`, carried by `carrier`.
    pub async fn plugin_message(
        &self,
        channel: impl Into<String>,
        carrier: Player,
        payload: Vec<u8>,
    ) -> Result<(), GateError> {
        self.send(GateCommand::PluginMessage {
            channel: channel.into(),
            carrier,
            payload,
        })
        .await
    }

    /// Stores a session produced by a local premium check (no proxy).
    /// Call after [`player_login`](Self::player_login).
    pub async fn begin_local_session(
        &self,
        player: Player,
        session: LoginSession,
    ) -> Result<(), GateError> {
        self.send(GateCommand::LocalSession { player, session }).await
    }

    /// Returns the login state of a connection.
    pub async fn connection_state(&self, player: &Player) -> Result<ConnectionSnapshot, GateError> {
        let (reply, rx) = oneshot::channel();
        self.send(GateCommand::Snapshot {
            player: player.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| GateError::Closed)
    }

    /// Last-known premium status of a player.
    pub async fn premium_status(&self, player_id: &PlayerId) -> PremiumStatus {
        self.premium.status(player_id).await
    }

    /// Stops the main loop. Background tasks already running finish on
    /// their own.
    pub async fn shutdown(&self) -> Result<(), GateError> {
        self.send(GateCommand::Shutdown).await
    }
}
