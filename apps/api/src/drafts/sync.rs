//! Cross-context refresh: feeds "storage changed" notifications into the
//! shared store.
//!
//! Store access goes through `spawn_blocking` because the medium behind it
//! may block on network I/O.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::drafts::storage::StorageEvent;
use crate::drafts::store::DraftStore;

/// Runs `f` against the locked store on the blocking pool. Returns `None`
/// when the lock is poisoned or the task panicked.
pub async fn with_store_blocking<T, F>(store: &Arc<Mutex<DraftStore>>, f: F) -> Option<T>
where
    F: FnOnce(&mut DraftStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = store.lock().ok()?;
        Some(f(&mut guard))
    })
    .await;
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!("Draft store task failed: {e}");
            None
        }
    }
}

/// Re-reads every key of the store. Called whenever notifications may have
/// been missed (lagging feed, resubscribed channel).
pub async fn resync(store: &Arc<Mutex<DraftStore>>) -> bool {
    with_store_blocking(store, |s| s.reload_all()).await.is_some()
}

/// Runs until the change feed closes. Each event is applied under the store
/// lock so it never interleaves with a request's mutation.
pub async fn run_sync_loop(
    store: Arc<Mutex<DraftStore>>,
    mut receiver: broadcast::Receiver<StorageEvent>,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let key = event.key.clone();
                match with_store_blocking(&store, move |s| s.on_storage_event(&event)).await {
                    Some(true) => debug!("Applied external change to {key}"),
                    Some(false) => {}
                    None => {
                        error!("Draft store unavailable, stopping sync loop");
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "Draft sync loop lagged, reloading all keys");
                if !resync(&store).await {
                    error!("Draft store unavailable, stopping sync loop");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Draft change feed closed, sync loop shutting down");
                break;
            }
        }
    }
}
