//! Automation record entity, its audit trail, and the outbound snapshot DTO.

use chrono::Utc;
use handoff_core::types::{RecordId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Lifecycle state of an automation record.
///
/// Transitions only move forward: `Queued` → `InProgress` →
/// (`AwaitingHuman` → `HumanClaimed` → `Resumed`) → `Completed`, with
/// `Failed` reachable from any non-terminal state. The claim states are
/// written by the operator-facing API; the worker only observes them
/// indirectly through the human-action message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    Queued = 0,
    InProgress = 1,
    AwaitingHuman = 2,
    HumanClaimed = 3,
    Resumed = 4,
    Completed = 5,
    Failed = 6,
}

/// Audit trail action types written during a record's lifecycle.
pub mod actions {
    pub const INTAKE: &str = "intake";
    pub const STARTED: &str = "started";
    pub const CAPTCHA_DETECTED: &str = "captcha_detected";
    pub const HUMAN_INPUT: &str = "human_input";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// A row from the `records` table plus its ordered action history.
///
/// Never serialized directly; [`RecordSnapshot`] is the wire form.
#[derive(Debug, Clone, FromRow)]
pub struct AutomationRecord {
    pub id: RecordId,
    pub status: RecordStatus,
    /// Ciphertext of the job's input document; only decrypted transiently
    /// inside the worker.
    pub encrypted_payload: String,
    pub source: Option<String>,
    pub result_url: Option<String>,
    pub screenshot_path: Option<String>,
    pub html_snapshot_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Append-only audit trail ordered by creation time. Lives in
    /// `record_actions`; populated by the repository, never by `FromRow`.
    #[sqlx(skip)]
    pub actions: Vec<RecordAction>,
}

impl AutomationRecord {
    /// A fresh `Queued` record holding an already-encrypted payload.
    pub fn queued(encrypted_payload: String, source: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_v4(),
            status: RecordStatus::Queued,
            encrypted_payload,
            source,
            result_url: None,
            screenshot_path: None,
            html_snapshot_path: None,
            created_at: now,
            updated_at: now,
            actions: Vec::new(),
        }
    }
}

/// A row from the `record_actions` table.
#[derive(Debug, Clone, FromRow)]
pub struct RecordAction {
    pub id: i64,
    pub record_id: RecordId,
    pub actor: String,
    pub action_type: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// An action about to be appended to a record's audit trail.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub actor: String,
    pub action_type: String,
    pub notes: Option<String>,
}

impl NewAction {
    /// An action performed by the automation worker itself.
    pub fn worker(action_type: &str) -> Self {
        Self {
            actor: "worker".into(),
            action_type: action_type.into(),
            notes: None,
        }
    }

    /// An action attributed to a human operator.
    pub fn operator(operator_id: &str, action_type: &str) -> Self {
        Self {
            actor: operator_id.into(),
            action_type: action_type.into(),
            notes: None,
        }
    }

    /// Attach a free-text note.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Full serialized view of a record, published on the status topics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub id: RecordId,
    pub status: RecordStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub source: Option<String>,
    pub result_url: Option<String>,
    pub screenshot_path: Option<String>,
    pub html_snapshot_path: Option<String>,
    /// Decrypted payload document, when the record holds one.
    pub payload: Option<serde_json::Value>,
    pub actions: Vec<ActionSnapshot>,
}

/// One audit trail entry inside a [`RecordSnapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSnapshot {
    pub actor: String,
    pub action_type: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

impl RecordSnapshot {
    /// Build a snapshot from a record and its already-decrypted payload.
    ///
    /// Actions are emitted in creation-time order regardless of how the
    /// caller's vector happens to be ordered.
    pub fn new(record: &AutomationRecord, payload: Option<serde_json::Value>) -> Self {
        let mut actions: Vec<ActionSnapshot> = record
            .actions
            .iter()
            .map(|a| ActionSnapshot {
                actor: a.actor.clone(),
                action_type: a.action_type.clone(),
                notes: a.notes.clone(),
                created_at: a.created_at,
            })
            .collect();
        actions.sort_by_key(|a| a.created_at);

        Self {
            id: record.id,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            source: record.source.clone(),
            result_url: record.result_url.clone(),
            screenshot_path: record.screenshot_path.clone(),
            html_snapshot_path: record.html_snapshot_path.clone(),
            payload,
            actions,
        }
    }
}
