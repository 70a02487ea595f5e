mod config;
mod drafts;
mod errors;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::drafts::redis_medium::{forward_changes, RedisMedium};
use crate::drafts::storage::{MemoryMedium, StorageEvent, StorageKeys, StorageMedium};
use crate::drafts::store::DraftStore;
use crate::drafts::sync::run_sync_loop;
use crate::routes::build_router;
use crate::state::AppState;

/// Capacity of the relay channel between the Redis subscriber and the sync loop.
const CHANGE_RELAY_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Drafts API v{}", env!("CARGO_PKG_VERSION"));

    let keys = StorageKeys::new(&config.drafts_namespace);
    let (medium, changes, relay) = open_medium(&config, &keys)?;
    let channel = keys.channel.clone();

    // Opening reads the medium, which may block on Redis.
    let store = tokio::task::spawn_blocking(move || DraftStore::open(medium, keys)).await?;
    let store = Arc::new(Mutex::new(store));
    tokio::spawn(run_sync_loop(Arc::clone(&store), changes));
    if let Some(ChangeRelay { client, sender }) = relay {
        tokio::spawn(forward_changes(client, channel, sender, Arc::clone(&store)));
    }

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis subscription that feeds the local change feed.
struct ChangeRelay {
    client: redis::Client,
    sender: broadcast::Sender<StorageEvent>,
}

/// Picks the Redis medium when `REDIS_URL` is set, the in-process medium
/// otherwise, and returns it with the feed of external change events.
fn open_medium(
    config: &Config,
    keys: &StorageKeys,
) -> Result<(
    Box<dyn StorageMedium>,
    broadcast::Receiver<StorageEvent>,
    Option<ChangeRelay>,
)> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let client = redis::Client::open(url)?;
            let medium = RedisMedium::open(&client, keys)?;
            let (sender, receiver) = broadcast::channel(CHANGE_RELAY_CAPACITY);
            info!("Using Redis draft medium");
            Ok((Box::new(medium), receiver, Some(ChangeRelay { client, sender })))
        }
        None => {
            let medium = MemoryMedium::new();
            let receiver = medium.changes();
            info!("Using in-process draft medium (set REDIS_URL to share drafts)");
            Ok((Box::new(medium), receiver, None))
        }
    }
}
