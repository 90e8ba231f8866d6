//! Wire messages carried on the automation topics.

use handoff_core::types::RecordId;
use serde::{Deserialize, Serialize};

/// Trigger published on [`topics::JOB_QUEUE`](crate::topics::JOB_QUEUE).
///
/// Carries only the record id; the worker re-reads the full record from the
/// store so the message can never go stale in transit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQueueMessage {
    pub record_id: RecordId,
}

/// Operator response published on
/// [`topics::HUMAN_ACTIONS`](crate::topics::HUMAN_ACTIONS).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanActionMessage {
    pub record_id: RecordId,
    /// Semi-structured input document: an optional `fields` array of
    /// `{selector, value}` entries plus an optional `clickSelector`.
    /// Kept as raw JSON; the session engine applies it leniently.
    pub inputs: serde_json::Value,
    #[serde(default)]
    pub notes: Option<String>,
    pub operator_id: String,
}
