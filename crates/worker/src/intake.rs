//! Job intake: one spawned session task per queued record.

use std::sync::Arc;

use handoff_bus::{Bus, BusError, JobQueueMessage};
use tokio_util::sync::CancellationToken;

use crate::session::SessionEngine;

/// Long-lived consumer of the job queue topic.
pub struct IntakeConsumer;

impl IntakeConsumer {
    /// Run the intake loop until shutdown or until the subscription ends.
    ///
    /// Every decoded message spawns an independent session task, so topic
    /// consumption is never blocked by a slow automation run. Malformed
    /// messages are logged and dropped without retry. No concurrency cap is
    /// applied here; bounding simultaneous browser sessions is a deployment
    /// concern.
    pub async fn run(
        bus: Arc<dyn Bus>,
        engine: Arc<SessionEngine>,
        cancel: CancellationToken,
    ) -> Result<(), BusError> {
        let mut receiver = bus.subscribe(handoff_bus::topics::JOB_QUEUE).await?;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Intake consumer shutting down");
                    return Ok(());
                }
                received = receiver.recv() => {
                    let Some(raw) = received else {
                        tracing::info!("Job queue subscription closed");
                        return Ok(());
                    };
                    match serde_json::from_str::<JobQueueMessage>(&raw) {
                        Ok(message) => {
                            tracing::info!(record_id = %message.record_id, "Job received");
                            let engine = Arc::clone(&engine);
                            let job_cancel = cancel.child_token();
                            tokio::spawn(async move {
                                engine.process(message.record_id, job_cancel).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to decode job queue message, dropping");
                        }
                    }
                }
            }
        }
    }
}
