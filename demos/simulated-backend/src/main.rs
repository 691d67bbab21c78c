use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fastgate::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// In-memory auth plugin
// ---------------------------------------------------------------------------

/// Stands in for the server's password plugin: name → password, plus who
/// is currently logged in.
#[derive(Default)]
struct MemoryAuth {
    accounts: Mutex<HashMap<String, String>>,
    logged_in: Mutex<Vec<String>>,
}

impl MemoryAuth {
    fn lock_err(&self) -> SessionError {
        SessionError::AuthPlugin {
            plugin: self.name().to_string(),
            reason: "state lock poisoned".into(),
        }
    }
}

impl AuthPlugin for MemoryAuth {
    fn name(&self) -> &str {
        "MemoryAuth"
    }

    fn is_registered(&self, player_name: &str) -> Result<bool, SessionError> {
        let accounts = self.accounts.lock().map_err(|_| self.lock_err())?;
        Ok(accounts.contains_key(player_name))
    }

    fn force_login(&self, player: &Player) -> Result<bool, SessionError> {
        if !self.is_registered(&player.name)? {
            return Ok(false);
        }
        let mut logged_in = self.logged_in.lock().map_err(|_| self.lock_err())?;
        logged_in.push(player.name.clone());
        Ok(true)
    }

    fn force_register(&self, player: &Player, password: &str) -> Result<bool, SessionError> {
        {
            let mut accounts = self.accounts.lock().map_err(|_| self.lock_err())?;
            if accounts.contains_key(&player.name) {
                return Ok(false);
            }
            accounts.insert(player.name.clone(), password.to_string());
        }
        self.force_login(player)
    }
}

// ---------------------------------------------------------------------------
// Simulated proxy and host events
// ---------------------------------------------------------------------------

fn player(name: &str, octet: u8) -> Player {
    Player::new(
        PlayerId(Uuid::new_v4()),
        name,
        SocketAddr::from(([10, 0, 0, octet], 41000)),
    )
}

fn action(name: &str, action: ActionType, proxy: ProxyId) -> Result<Vec<u8>, GateError> {
    Ok(BinaryCodec.encode(&LoginActionMessage::new(name, action, proxy))?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let proxy = ProxyId::random();
    let trust = ProxyTrustStore::parse(&format!("# bungee-1\n{proxy}\n"))?;

    let auth = Arc::new(MemoryAuth::default());
    auth.accounts
        .lock()
        .map_err(|_| "auth state poisoned")?
        .insert("Notch".into(), "hunter2".into());

    let registry = {
        let auth = Arc::clone(&auth);
        AuthHookRegistry::new().register("MemoryAuth", move || Arc::clone(&auth) as Arc<dyn AuthPlugin>)
    };

    let config = GateConfig::from_json_str(r#"{ "settle_delay_ticks": 5 }"#)?;
    let gate = GateBuilder::new()
        .config(config)
        .trust_store(trust)
        .auth_registry(registry, |name| name == "MemoryAuth")
        .build()?;
    let handle = gate.handle();
    let running = tokio::spawn(gate.run());

    // Existing account: the proxy's message lands before the join event.
    let notch = player("Notch", 1);
    handle.player_login(notch.clone()).await?;
    handle
        .plugin_message(FORCE_CHANNEL, notch.clone(), action("Notch", ActionType::Login, proxy)?)
        .await?;
    handle.player_join(notch.clone()).await?;

    // New account: the join event fires first, then the proxy asks for a
    // registration.
    let jeb = player("jeb_", 2);
    handle.player_login(jeb.clone()).await?;
    handle.player_join(jeb.clone()).await?;
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle
        .plugin_message(FORCE_CHANNEL, jeb.clone(), action("jeb_", ActionType::Register, proxy)?)
        .await?;

    // Offline-mode player: nothing to force.
    let guest = player("Guest42", 3);
    handle.player_login(guest.clone()).await?;
    handle
        .plugin_message(FORCE_CHANNEL, guest.clone(), action("Guest42", ActionType::Cracked, proxy)?)
        .await?;
    handle.player_join(guest.clone()).await?;

    // A proxy we never heard of.
    handle
        .plugin_message(
            FORCE_CHANNEL,
            guest.clone(),
            action("Guest42", ActionType::Login, ProxyId::random())?,
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(600)).await;

    for p in [&notch, &jeb, &guest] {
        let state = handle.connection_state(p).await?;
        let status = handle.premium_status(&p.id).await;
        tracing::info!(player = %p, phase = %state.phase, %status, "final state");
    }
    let logged_in = auth
        .logged_in
        .lock()
        .map_err(|_| "auth state poisoned")?
        .clone();
    tracing::info!(?logged_in, "forced logins");

    handle.shutdown().await?;
    running.await?;
    Ok(())
}
