//! Well-known topic name constants.
//!
//! These must match the channel names the intake/submit API publishes on
//! and the notification service subscribes to.

/// Job triggers from the intake API, consumed by the worker.
pub const JOB_QUEUE: &str = "automation-jobs";

/// Operator input from the submit API, consumed by the worker.
pub const HUMAN_ACTIONS: &str = "automation-human-actions";

/// Escalation announcements for records that just entered `AwaitingHuman`.
pub const AWAITING_HUMAN: &str = "automation-awaiting-human";

/// Record snapshots published on every significant transition.
pub const STATUS_UPDATES: &str = "automation-status-updates";
