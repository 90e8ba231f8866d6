//! Persistence seam used by the session engine.
//!
//! The engine only ever needs two operations against the store: load a
//! record with its history, and persist a state transition together with
//! one appended audit action. Keeping this behind a trait lets the engine
//! run against an in-memory store in tests.

use async_trait::async_trait;
use handoff_core::types::RecordId;

use crate::models::record::{AutomationRecord, NewAction, RecordAction};
use crate::repositories::RecordRepo;
use crate::DbPool;

/// Store access failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Record persistence contract.
///
/// Implementations must append the action atomically with the record write
/// and must use short-lived, per-operation sessions: the human-input wait
/// can last arbitrarily long, so no transaction may ever span two calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record and its ordered action history.
    async fn load(&self, id: RecordId) -> Result<Option<AutomationRecord>, StoreError>;

    /// Persist the record's status/evidence fields and append one audit
    /// action atomically, returning the stored action.
    async fn transition(
        &self,
        record: &AutomationRecord,
        action: NewAction,
    ) -> Result<RecordAction, StoreError>;
}

/// Postgres-backed [`RecordStore`] over the shared pool.
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn load(&self, id: RecordId) -> Result<Option<AutomationRecord>, StoreError> {
        Ok(RecordRepo::fetch(&self.pool, id).await?)
    }

    async fn transition(
        &self,
        record: &AutomationRecord,
        action: NewAction,
    ) -> Result<RecordAction, StoreError> {
        Ok(RecordRepo::transition(&self.pool, record, &action).await?)
    }
}
