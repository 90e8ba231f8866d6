//! The automation session engine: drives one record from pickup to a
//! terminal state, escalating to a human operator when a challenge blocks
//! the run.
//!
//! Each job runs in its own spawned task with its own browser session and
//! short-lived store operations. [`SessionEngine::process`] is the task's
//! single fault boundary: any error inside the pipeline is absorbed there
//! and converted into a terminal `Failed` state plus a status event;
//! nothing propagates to the intake consumer. The one exception is a
//! cancelled human-input wait, which leaves the record untouched so a
//! restarted worker can pick the escalation back up.

use std::sync::Arc;

use handoff_browser::{AutomationSession, BrowserError, SessionFactory};
use handoff_bus::{topics, Bus};
use handoff_core::crypto::{CryptoError, PayloadCipher};
use handoff_core::types::RecordId;
use handoff_db::models::record::{
    actions, AutomationRecord, NewAction, RecordSnapshot, RecordStatus,
};
use handoff_db::store::{RecordStore, StoreError};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::bridge::StatusPublisher;
use crate::detect::ChallengeDetector;
use crate::evidence::EvidenceStore;
use crate::rendezvous::RendezvousTable;

/// Failure inside one session run, absorbed at the `process` boundary.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Evidence write failed: {0}")]
    Evidence(#[from] std::io::Error),

    /// Shutdown arrived while waiting for human input. Not a fault: the
    /// record stays in its awaiting state.
    #[error("Wait for human input was cancelled")]
    Cancelled,
}

/// State machine driving one automation record per invocation.
pub struct SessionEngine {
    store: Arc<dyn RecordStore>,
    browser: Arc<dyn SessionFactory>,
    cipher: Arc<PayloadCipher>,
    evidence: Arc<EvidenceStore>,
    rendezvous: Arc<RendezvousTable>,
    detector: ChallengeDetector,
    publisher: StatusPublisher,
}

impl SessionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RecordStore>,
        browser: Arc<dyn SessionFactory>,
        bus: Arc<dyn Bus>,
        cipher: Arc<PayloadCipher>,
        evidence: Arc<EvidenceStore>,
        rendezvous: Arc<RendezvousTable>,
        detector: ChallengeDetector,
    ) -> Self {
        Self {
            store,
            browser,
            cipher,
            evidence,
            rendezvous,
            detector,
            publisher: StatusPublisher::new(bus),
        }
    }

    /// Process one record to a terminal state. The task's fault boundary.
    pub async fn process(&self, record_id: RecordId, cancel: CancellationToken) {
        match self.run(record_id, &cancel).await {
            Ok(()) => {}
            Err(SessionError::Cancelled) => {
                tracing::info!(
                    record_id = %record_id,
                    "Shutdown while awaiting human input, leaving record for a later resume"
                );
            }
            Err(e) => {
                tracing::error!(record_id = %record_id, error = %e, "Session failed");
                self.mark_failed(record_id, &e.to_string()).await;
            }
        }
    }

    async fn run(&self, record_id: RecordId, cancel: &CancellationToken) -> Result<(), SessionError> {
        let Some(mut record) = self.store.load(record_id).await? else {
            tracing::warn!(record_id = %record_id, "Record not found, dropping job");
            return Ok(());
        };

        record.status = RecordStatus::InProgress;
        self.persist(&mut record, NewAction::worker(actions::STARTED))
            .await?;

        let Some(target_url) = self.extract_target_url(&record)? else {
            self.fail_record(&mut record, "Missing targetUrl in payload")
                .await?;
            return Ok(());
        };

        let session = self.browser.open().await?;
        let outcome = self.drive(&mut record, session.as_ref(), &target_url, cancel).await;

        // Best-effort teardown; the outcome of the run stands either way.
        if let Err(e) = session.close().await {
            tracing::debug!(record_id = %record.id, error = %e, "Browser session close failed");
        }
        outcome
    }

    async fn drive(
        &self,
        record: &mut AutomationRecord,
        session: &dyn AutomationSession,
        target_url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        session.navigate(target_url).await?;

        if self.detector.detect(session).await? {
            self.handle_challenge(record, session, cancel).await
        } else {
            self.complete(record, session).await
        }
    }

    /// Escalate: capture evidence, announce, suspend until a human answers,
    /// then apply the answer and finish the run.
    async fn handle_challenge(
        &self,
        record: &mut AutomationRecord,
        session: &dyn AutomationSession,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        tracing::info!(record_id = %record.id, "Challenge detected, escalating to a human operator");

        let prefix = record.id.to_string();
        let screenshot = session.screenshot().await?;
        let screenshot_path = self.evidence.save_screenshot(&screenshot, &prefix).await?;
        let markup = session.markup().await?;
        let markup_path = self.evidence.save_markup(&markup, &prefix).await?;

        record.status = RecordStatus::AwaitingHuman;
        record.screenshot_path = Some(screenshot_path);
        record.html_snapshot_path = Some(markup_path);
        self.persist(record, NewAction::worker(actions::CAPTCHA_DETECTED))
            .await?;

        // Evidence and status must be visible to operators before the
        // worker goes to sleep on the rendezvous.
        let snapshot = self.snapshot(record);
        self.publisher.publish(topics::AWAITING_HUMAN, &snapshot).await;
        self.publisher.publish(topics::STATUS_UPDATES, &snapshot).await;

        let message = self
            .rendezvous
            .wait(record.id, cancel)
            .await
            .map_err(|_| SessionError::Cancelled)?;

        apply_human_input(session, &message.inputs).await?;

        record.status = RecordStatus::Resumed;
        let mut action = NewAction::operator(&message.operator_id, actions::HUMAN_INPUT);
        if let Some(notes) = message.notes {
            action = action.with_notes(notes);
        }
        self.persist(record, action).await?;

        self.complete(record, session).await
    }

    /// Finalize: capture the final screenshot, record where navigation
    /// ended up, and mark the record `Completed`.
    async fn complete(
        &self,
        record: &mut AutomationRecord,
        session: &dyn AutomationSession,
    ) -> Result<(), SessionError> {
        let screenshot = session.screenshot().await?;
        let prefix = format!("{}_final", record.id);
        record.screenshot_path = Some(self.evidence.save_screenshot(&screenshot, &prefix).await?);
        record.result_url = Some(session.current_url().await?);
        record.status = RecordStatus::Completed;
        self.persist(record, NewAction::worker(actions::COMPLETED))
            .await?;

        self.publisher
            .publish(topics::STATUS_UPDATES, &self.snapshot(record))
            .await;
        tracing::info!(record_id = %record.id, "Record completed");
        Ok(())
    }

    /// Explicit failure for a record already loaded in this run.
    async fn fail_record(
        &self,
        record: &mut AutomationRecord,
        reason: &str,
    ) -> Result<(), SessionError> {
        record.status = RecordStatus::Failed;
        self.persist(record, NewAction::worker(actions::FAILED).with_notes(reason))
            .await?;
        self.publisher
            .publish(topics::STATUS_UPDATES, &self.snapshot(record))
            .await;
        Ok(())
    }

    /// The fault path: reload the record in a fresh scope and mark it
    /// `Failed` with the fault's message. Errors here can only be logged,
    /// there is nowhere left to surface them.
    async fn mark_failed(&self, record_id: RecordId, fault: &str) {
        let mut record = match self.store.load(record_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(record_id = %record_id, "Record vanished before failure could be recorded");
                return;
            }
            Err(e) => {
                tracing::error!(record_id = %record_id, error = %e, "Could not reload record on the fault path");
                return;
            }
        };

        record.status = RecordStatus::Failed;
        if let Err(e) = self
            .persist(&mut record, NewAction::worker(actions::FAILED).with_notes(fault))
            .await
        {
            tracing::error!(record_id = %record_id, error = %e, "Could not persist failure state");
            return;
        }
        self.publisher
            .publish(topics::STATUS_UPDATES, &self.snapshot(&record))
            .await;
    }

    /// Persist a transition and mirror the stored action into the
    /// in-memory record so later snapshots carry the full history.
    async fn persist(
        &self,
        record: &mut AutomationRecord,
        action: NewAction,
    ) -> Result<(), SessionError> {
        let stored = self.store.transition(record, action).await?;
        record.updated_at = stored.created_at;
        record.actions.push(stored);
        Ok(())
    }

    /// Decrypt the payload and pull out the navigation target, if any.
    fn extract_target_url(&self, record: &AutomationRecord) -> Result<Option<String>, SessionError> {
        let plaintext = self.cipher.decrypt(&record.encrypted_payload)?;
        if plaintext.is_empty() {
            return Ok(None);
        }
        let payload: Value = serde_json::from_str(&plaintext)?;
        Ok(payload
            .get("targetUrl")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Outbound view of the record, with the payload decrypted when it
    /// decrypts cleanly.
    fn snapshot(&self, record: &AutomationRecord) -> RecordSnapshot {
        let payload = self
            .cipher
            .decrypt(&record.encrypted_payload)
            .ok()
            .filter(|plaintext| !plaintext.is_empty())
            .and_then(|plaintext| serde_json::from_str(&plaintext).ok());
        RecordSnapshot::new(record, payload)
    }
}

/// Apply an operator's input document to the page, leniently.
///
/// Fields are applied in document order; entries with a missing selector or
/// a missing/non-string value are skipped without failing the job. A
/// `clickSelector`, when present, is clicked after all fills.
async fn apply_human_input(
    session: &dyn AutomationSession,
    inputs: &Value,
) -> Result<(), BrowserError> {
    let Some(inputs) = inputs.as_object() else {
        return Ok(());
    };

    if let Some(fields) = inputs.get("fields").and_then(Value::as_array) {
        for field in fields {
            let Some(selector) = field.get("selector").and_then(Value::as_str) else {
                continue;
            };
            if selector.trim().is_empty() {
                continue;
            }
            let Some(value) = field.get("value").and_then(Value::as_str) else {
                continue;
            };
            session.fill(selector, value).await?;
        }
    }

    if let Some(selector) = inputs.get("clickSelector").and_then(Value::as_str) {
        if !selector.trim().is_empty() {
            session.click(selector).await?;
        }
    }
    Ok(())
}
