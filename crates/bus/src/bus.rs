//! The [`Bus`] seam and the in-process [`LocalBus`] implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;

/// Capacity of each subscriber's buffer. A subscriber that falls this far
/// behind starts losing messages, consistent with at-most-once delivery.
const SUBSCRIBER_BUFFER: usize = 64;

/// Transport failure while publishing or subscribing.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Fire-and-forget publish/subscribe transport.
///
/// Delivery is at-most-once: a publish with no subscribers is silently
/// dropped, and nothing is ever redelivered.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish a serialized message to a topic.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError>;

    /// Subscribe to a topic, receiving every message published after the
    /// subscription is established.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError>;
}

/// In-process [`Bus`] for tests and single-process deployments.
///
/// Fan-out semantics mirror a broadcast channel: every live subscriber of a
/// topic gets its own copy of each published message.
#[derive(Default)]
pub struct LocalBus {
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<String>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        let mut topics = self.topics.lock().await;
        if let Some(senders) = topics.get_mut(topic) {
            senders.retain(|tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                // Slow receiver: the message is lost for it, the
                // subscription stays.
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Closed(_)) => false,
            });
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, BusError> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
