//! Persistence medium for the draft collection.
//!
//! The medium is a plain key-value string store holding two keys: the JSON
//! array of drafts and the active draft id. Every handle carries an `origin`
//! so that change notifications can be told apart from the handle's own
//! writes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Key names used by one draft namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub drafts: String,
    pub active: String,
    pub channel: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            drafts: format!("{namespace}:drafts"),
            active: format!("{namespace}:active_draft_id"),
            channel: format!("{namespace}:changes"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new("resume")
    }
}

/// "Storage changed" signal: which key was written, and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub key: String,
    pub origin: Uuid,
}

/// Synchronous key-value medium backing a `DraftStore`.
pub trait StorageMedium: Send {
    /// Identity of this handle; stamped on every change event it emits.
    fn origin(&self) -> Uuid;

    /// Missing keys are `Ok(None)`, never an error.
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process medium
// ────────────────────────────────────────────────────────────────────────────

/// In-process medium. Handles created with [`MemoryMedium::connect`] share
/// one map and one change feed, which is how several execution contexts are
/// modelled in a single process.
pub struct MemoryMedium {
    origin: Uuid,
    entries: Arc<Mutex<HashMap<String, String>>>,
    changes: broadcast::Sender<StorageEvent>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            origin: Uuid::new_v4(),
            entries: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }

    /// Opens another handle on the same shared space with its own origin.
    pub fn connect(&self) -> Self {
        Self {
            origin: Uuid::new_v4(),
            entries: Arc::clone(&self.entries),
            changes: self.changes.clone(),
        }
    }

    /// Subscribes to writes made through any handle of this space.
    pub fn changes(&self) -> broadcast::Receiver<StorageEvent> {
        self.changes.subscribe()
    }

    fn notify(&self, key: &str) {
        // Zero receivers is fine.
        let _ = self.changes.send(StorageEvent {
            key: key.to_string(),
            origin: self.origin,
        });
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory medium lock poisoned".to_string()))
    }
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageMedium for MemoryMedium {
    fn origin(&self) -> Uuid {
        self.origin
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        self.notify(key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let removed = self.lock()?.remove(key);
        if removed.is_some() {
            self.notify(key);
        }
        Ok(())
    }
}
