#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::{Transaction, params};
use wq_core::model::JobEventType;

pub(in crate::store) fn insert_job_event_tx(
    tx: &Transaction<'_>,
    job_id: &str,
    at_ms: i64,
    event_type: JobEventType,
    message: &str,
    attempt: u32,
) -> Result<i64, StoreError> {
    tx.execute(
        r#"
        INSERT INTO job_events(job_id, at, type, message, attempt)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![job_id, at_ms, event_type.as_str(), message, attempt],
    )?;
    Ok(tx.last_insert_rowid())
}
