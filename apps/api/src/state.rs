use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::drafts::store::DraftStore;
use crate::errors::AppError;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// One store per process. Its medium may block on network I/O, so it is
    /// only touched through [`AppState::with_store`].
    pub store: Arc<Mutex<DraftStore>>,
    pub config: Config,
}

impl AppState {
    /// Runs one store operation to completion on the blocking pool, holding
    /// the store lock for its duration.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut DraftStore) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| AppError::Internal(anyhow::anyhow!("draft store lock poisoned")))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("draft store task failed: {e}")))?
    }
}
