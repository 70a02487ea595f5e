//! Redis-backed medium. Writes go through a synchronous connection and are
//! announced on a pub/sub channel so that every other API instance sharing
//! the namespace can refresh its in-memory view.
//!
//! Calls block; the store that owns this medium is only driven from the
//! blocking pool.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis::Commands;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::drafts::storage::{StorageError, StorageEvent, StorageKeys, StorageMedium};
use crate::drafts::store::DraftStore;
use crate::drafts::sync::resync;

/// Attempts per command: the live connection, then one fresh connection.
const COMMAND_ATTEMPTS: usize = 2;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Runs `op` on the connection in `slot`, opening one when the slot is empty.
/// A failed command drops the connection so the next attempt starts fresh.
fn with_reconnect<C, T, E, Open, Op>(
    slot: &mut Option<C>,
    attempts: usize,
    mut open: Open,
    mut op: Op,
) -> Result<T, E>
where
    Open: FnMut() -> Result<C, E>,
    Op: FnMut(&mut C) -> Result<T, E>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = if let Some(conn) = slot.as_mut() {
            op(conn)
        } else {
            match open() {
                Ok(conn) => op(slot.insert(conn)),
                Err(e) => Err(e),
            }
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                *slot = None;
                if attempt >= attempts {
                    return Err(e);
                }
                warn!("Redis command failed, retrying on a fresh connection: {e}");
            }
        }
    }
}

pub struct RedisMedium {
    origin: Uuid,
    client: redis::Client,
    connection: Option<redis::Connection>,
    channel: String,
}

impl RedisMedium {
    pub fn open(client: &redis::Client, keys: &StorageKeys) -> Result<Self, StorageError> {
        let connection = client.get_connection()?;
        let origin = Uuid::new_v4();
        info!("Redis draft medium opened (origin {origin}, channel {})", keys.channel);
        Ok(Self {
            origin,
            client: client.clone(),
            connection: Some(connection),
            channel: keys.channel.clone(),
        })
    }

    fn run<T, F>(&mut self, op: F) -> Result<T, StorageError>
    where
        F: FnMut(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let client = &self.client;
        Ok(with_reconnect(
            &mut self.connection,
            COMMAND_ATTEMPTS,
            || client.get_connection(),
            op,
        )?)
    }

    fn publish(&mut self, key: &str) -> Result<(), StorageError> {
        let payload = serde_json::to_string(&StorageEvent {
            key: key.to_string(),
            origin: self.origin,
        })?;
        let channel = self.channel.clone();
        self.run(|con| con.publish::<_, _, ()>(&channel, &payload))
    }
}

impl StorageMedium for RedisMedium {
    fn origin(&self) -> Uuid {
        self.origin
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        self.run(|con| con.get::<_, Option<String>>(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.run(|con| con.set::<_, _, ()>(key, value))?;
        self.publish(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let removed: i64 = self.run(|con| con.del(key))?;
        if removed > 0 {
            self.publish(key)?;
        }
        Ok(())
    }
}

/// Relays change notifications from the Redis channel into the local change
/// feed for the life of the process. The subscription is re-established with
/// exponential backoff whenever it fails or ends, and the store reloads every
/// key after each (re)subscribe since notifications may have been missed.
pub async fn forward_changes(
    client: redis::Client,
    channel: String,
    sender: broadcast::Sender<StorageEvent>,
    store: Arc<Mutex<DraftStore>>,
) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match relay_once(&client, &channel, &sender, &store, &mut backoff).await {
            Ok(()) => warn!("Draft change channel {channel} closed, resubscribing"),
            Err(e) => error!("Draft change subscription failed: {e}"),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
        if sender.receiver_count() == 0 {
            info!("No sync loop listening on {channel}, stopping relay");
            return;
        }
    }
}

async fn relay_once(
    client: &redis::Client,
    channel: &str,
    sender: &broadcast::Sender<StorageEvent>,
    store: &Arc<Mutex<DraftStore>>,
    backoff: &mut Duration,
) -> Result<(), StorageError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!("Subscribed to draft change channel {channel}");
    *backoff = INITIAL_BACKOFF;

    if !resync(store).await {
        return Err(StorageError::Unavailable("draft store unavailable".to_string()));
    }

    let mut messages = Box::pin(pubsub.on_message());
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!("Dropping unreadable change notification: {e}");
                continue;
            }
        };
        match serde_json::from_str::<StorageEvent>(&payload) {
            Ok(event) => {
                let _ = sender.send(event);
            }
            Err(e) => warn!("Dropping malformed change notification: {e}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeConn {
        healthy: bool,
        generation: u32,
    }

    #[test]
    fn test_reconnects_after_failed_command() {
        let mut slot = Some(FakeConn {
            healthy: false,
            generation: 0,
        });
        let mut opened = 0;
        let result: Result<u32, String> = with_reconnect(
            &mut slot,
            2,
            || {
                opened += 1;
                Ok(FakeConn {
                    healthy: true,
                    generation: opened,
                })
            },
            |conn| {
                if conn.healthy {
                    Ok(conn.generation)
                } else {
                    Err("broken pipe".to_string())
                }
            },
        );
        assert_eq!(result, Ok(1));
        assert_eq!(opened, 1);
        assert_eq!(slot.unwrap().generation, 1);
    }

    #[test]
    fn test_empty_slot_is_opened() {
        let mut slot: Option<FakeConn> = None;
        let result: Result<u32, String> = with_reconnect(
            &mut slot,
            2,
            || {
                Ok(FakeConn {
                    healthy: true,
                    generation: 7,
                })
            },
            |conn| Ok(conn.generation),
        );
        assert_eq!(result, Ok(7));
        assert!(slot.is_some());
    }

    #[test]
    fn test_gives_up_after_attempts() {
        let mut slot: Option<FakeConn> = None;
        let mut opened = 0;
        let result: Result<u32, String> = with_reconnect(
            &mut slot,
            2,
            || {
                opened += 1;
                Ok(FakeConn {
                    healthy: false,
                    generation: opened,
                })
            },
            |_| Err("connection refused".to_string()),
        );
        assert_eq!(result, Err("connection refused".to_string()));
        assert_eq!(opened, 2);
        assert!(slot.is_none());
    }

    #[test]
    fn test_open_failure_is_returned() {
        let mut slot: Option<FakeConn> = None;
        let result: Result<u32, String> =
            with_reconnect(&mut slot, 2, || Err("no route".to_string()), |c| Ok(c.generation));
        assert_eq!(result, Err("no route".to_string()));
    }
}
