//! Redis-backed [`Bus`] over the server's pub/sub channels.
//!
//! Redis pub/sub is inherently at-most-once: messages published while a
//! subscriber is disconnected are gone. That matches the transport contract
//! this system is specified against, so no buffering is layered on top.

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;

use crate::bus::{Bus, BusError};

/// Capacity of the channel bridging the pub/sub stream to the subscriber.
const SUBSCRIBER_BUFFER: usize = 64;

/// [`Bus`] implementation over a Redis server.
pub struct RedisBus {
    client: redis::Client,
}

impl RedisBus {
    /// Create a bus from a Redis connection URL (e.g. `redis://redis:6379`).
    ///
    /// The URL is validated here; connections are established lazily per
    /// operation.
    pub fn connect(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)
            .map_err(|e| BusError::Transport(format!("redis client init failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BusError::Transport(format!("redis connect failed: {e}")))?;
        let _receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| BusError::Transport(format!("publish failed: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Transport(format!("redis connect failed: {e}")))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| BusError::Transport(format!("subscribe failed: {e}")))?;

        let topic = topic.to_string();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "Discarding non-text message");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    tracing::info!(topic = %topic, "Subscriber dropped, ending pub/sub task");
                    break;
                }
            }
        });
        Ok(rx)
    }
}
