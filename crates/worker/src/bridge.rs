//! Bridges between the bus topics and the worker's internals.
//!
//! Inbound, [`HumanActionBridge`] turns human-action messages into
//! rendezvous resolutions. Outbound, [`StatusPublisher`] pushes record
//! snapshots to the notification topics, fire-and-forget.

use std::sync::Arc;

use handoff_bus::{Bus, BusError, HumanActionMessage};
use handoff_db::models::record::RecordSnapshot;
use tokio_util::sync::CancellationToken;

use crate::rendezvous::RendezvousTable;

/// Long-lived task decoding human actions and resolving pending waits.
pub struct HumanActionBridge;

impl HumanActionBridge {
    /// Run the inbound loop until shutdown or until the subscription ends.
    ///
    /// Malformed messages are logged and dropped: a human response that
    /// cannot be decoded simply never resolves its wait. Messages for
    /// records with no pending wait are ignored.
    pub async fn run(
        bus: Arc<dyn Bus>,
        rendezvous: Arc<RendezvousTable>,
        cancel: CancellationToken,
    ) -> Result<(), BusError> {
        let mut receiver = bus.subscribe(handoff_bus::topics::HUMAN_ACTIONS).await?;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Human action bridge shutting down");
                    return Ok(());
                }
                received = receiver.recv() => {
                    let Some(raw) = received else {
                        tracing::info!("Human action subscription closed");
                        return Ok(());
                    };
                    match serde_json::from_str::<HumanActionMessage>(&raw) {
                        Ok(message) => {
                            let record_id = message.record_id;
                            if !rendezvous.resolve(message).await {
                                tracing::debug!(
                                    record_id = %record_id,
                                    "Human action arrived with no pending wait"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to decode human action message");
                        }
                    }
                }
            }
        }
    }
}

/// Fire-and-forget snapshot publisher for the status topics.
#[derive(Clone)]
pub struct StatusPublisher {
    bus: Arc<dyn Bus>,
}

impl StatusPublisher {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self { bus }
    }

    /// Serialize and publish a snapshot.
    ///
    /// Publish failures are logged and swallowed: losing a notification
    /// must never fail the job that produced it.
    pub async fn publish(&self, topic: &str, snapshot: &RecordSnapshot) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(record_id = %snapshot.id, error = %e, "Snapshot serialization failed");
                return;
            }
        };
        if let Err(e) = self.bus.publish(topic, payload).await {
            tracing::warn!(
                record_id = %snapshot.id,
                topic,
                error = %e,
                "Status publish failed, continuing"
            );
        }
    }
}
