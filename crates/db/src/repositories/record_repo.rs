//! Repository for the `records` and `record_actions` tables.

use handoff_core::types::RecordId;
use sqlx::PgPool;

use crate::models::record::{AutomationRecord, NewAction, RecordAction};

/// Column list for `records` queries.
const RECORD_COLUMNS: &str = "id, status, encrypted_payload, source, result_url, \
     screenshot_path, html_snapshot_path, created_at, updated_at";

/// Column list for `record_actions` queries.
const ACTION_COLUMNS: &str = "id, record_id, actor, action_type, notes, created_at";

/// Provides read/write operations for automation records.
pub struct RecordRepo;

impl RecordRepo {
    /// Fetch a record with its ordered action history.
    pub async fn fetch(
        pool: &PgPool,
        id: RecordId,
    ) -> Result<Option<AutomationRecord>, sqlx::Error> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = $1");
        let record = sqlx::query_as::<_, AutomationRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let Some(mut record) = record else {
            return Ok(None);
        };
        record.actions = Self::list_actions(pool, id).await?;
        Ok(Some(record))
    }

    /// List a record's actions ordered oldest-first.
    pub async fn list_actions(
        pool: &PgPool,
        record_id: RecordId,
    ) -> Result<Vec<RecordAction>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTION_COLUMNS} FROM record_actions \
             WHERE record_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, RecordAction>(&query)
            .bind(record_id)
            .fetch_all(pool)
            .await
    }

    /// Persist the record's mutable fields and append one audit action in a
    /// single transaction, returning the stored action row.
    ///
    /// The status write and the action append must land together so a crash
    /// between them cannot leave the audit trail out of step with the state.
    pub async fn transition(
        pool: &PgPool,
        record: &AutomationRecord,
        action: &NewAction,
    ) -> Result<RecordAction, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE records SET status = $2, result_url = $3, screenshot_path = $4, \
                 html_snapshot_path = $5, updated_at = now() \
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.status)
        .bind(&record.result_url)
        .bind(&record.screenshot_path)
        .bind(&record.html_snapshot_path)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO record_actions (record_id, actor, action_type, notes) \
             VALUES ($1, $2, $3, $4) RETURNING {ACTION_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, RecordAction>(&query)
            .bind(record.id)
            .bind(&action.actor)
            .bind(&action.action_type)
            .bind(&action.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }
}
