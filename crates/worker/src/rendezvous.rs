//! In-process rendezvous between a waiting session task and a
//! later-arriving human action, correlated by record id.
//!
//! This is the one genuinely concurrency-sensitive structure in the worker:
//! [`wait`](RendezvousTable::wait) and [`resolve`](RendezvousTable::resolve)
//! race from independent tasks, so entry creation is an atomic
//! get-or-create and resolution is an atomic remove-then-deliver. An entry
//! never outlives interest in it: delivery removes it, and cancellation
//! removes it before the wait returns.

use std::collections::HashMap;

use handoff_bus::HumanActionMessage;
use handoff_core::types::RecordId;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

/// The wait was abandoned before a human action arrived.
#[derive(Debug, thiserror::Error)]
#[error("Wait for human input was cancelled")]
pub struct WaitCancelled;

/// Correlates pending waits with incoming human actions.
///
/// At most one entry exists per record id; a second concurrent
/// [`wait`](Self::wait) for the same id attaches to the existing entry, so
/// a single [`resolve`](Self::resolve) releases every attached waiter.
#[derive(Default)]
pub struct RendezvousTable {
    pending: Mutex<HashMap<RecordId, broadcast::Sender<HumanActionMessage>>>,
}

impl RendezvousTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend until a human action for `record_id` is resolved, or until
    /// the cancellation token fires.
    ///
    /// Cancellation removes the entry, so a resolve arriving afterwards is
    /// a no-op. Cancelling also closes the entry's channel, which fails any
    /// other waiter attached to it.
    pub async fn wait(
        &self,
        record_id: RecordId,
        cancel: &CancellationToken,
    ) -> Result<HumanActionMessage, WaitCancelled> {
        let mut rx = {
            let mut pending = self.pending.lock().await;
            pending
                .entry(record_id)
                .or_insert_with(|| broadcast::channel(1).0)
                .subscribe()
        };

        tokio::select! {
            delivery = rx.recv() => delivery.map_err(|_| WaitCancelled),
            _ = cancel.cancelled() => {
                self.pending.lock().await.remove(&record_id);
                Err(WaitCancelled)
            }
        }
    }

    /// Deliver a human action to the waiter registered for its record id.
    ///
    /// Returns whether a waiter received the message. An unknown record id
    /// is a no-op; duplicate deliveries and responses to expired jobs land
    /// here.
    pub async fn resolve(&self, message: HumanActionMessage) -> bool {
        let sender = self.pending.lock().await.remove(&message.record_id);
        match sender {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Whether a wait is currently registered for `record_id`.
    pub async fn has_waiter(&self, record_id: RecordId) -> bool {
        self.pending.lock().await.contains_key(&record_id)
    }
}
