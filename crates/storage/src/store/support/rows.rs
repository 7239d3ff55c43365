#![forbid(unsafe_code)]

use super::json::decode_json_lenient;
use super::super::types::{JobEventRow, JobRow};
use rusqlite::types::Type;
use wq_core::model::{JobEventType, JobStatus};

/// Column order expected by [`read_job_row`].
pub(in crate::store) const JOB_COLUMNS: &str = "job_id, kind, payload_json, requester, \
     idempotency_key, status, priority, run_at, created_at, updated_at, attempt, max_attempts, \
     locked_by, lease_until, last_error, result_json";

pub(in crate::store) const JOB_EVENT_COLUMNS: &str = "seq, job_id, at, type, message, attempt";

pub(in crate::store) fn read_job_row(row: &rusqlite::Row<'_>) -> Result<JobRow, rusqlite::Error> {
    let job_id: String = row.get(0)?;
    let payload_raw: String = row.get(2)?;
    let status_raw: String = row.get(5)?;
    let result_raw: Option<String> = row.get(15)?;

    let payload = decode_json_lenient(&job_id, "payload_json", &payload_raw);
    let result = result_raw.map(|raw| decode_json_lenient(&job_id, "result_json", &raw));

    Ok(JobRow {
        kind: row.get(1)?,
        payload,
        requester: row.get(3)?,
        idempotency_key: row.get(4)?,
        status: parse_status(5, &status_raw)?,
        priority: row.get(6)?,
        run_at_ms: row.get(7)?,
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
        attempt: row.get(10)?,
        max_attempts: row.get(11)?,
        locked_by: row.get(12)?,
        lease_until_ms: row.get(13)?,
        last_error: row.get(14)?,
        result,
        job_id,
    })
}

pub(in crate::store) fn read_job_event_row(
    row: &rusqlite::Row<'_>,
) -> Result<JobEventRow, rusqlite::Error> {
    let type_raw: String = row.get(3)?;
    let event_type = JobEventType::parse(&type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown job event type {type_raw:?}").into(),
        )
    })?;
    Ok(JobEventRow {
        seq: row.get(0)?,
        job_id: row.get(1)?,
        at_ms: row.get(2)?,
        event_type,
        message: row.get(4)?,
        attempt: row.get(5)?,
    })
}

pub(in crate::store) fn parse_status(idx: usize, raw: &str) -> Result<JobStatus, rusqlite::Error> {
    JobStatus::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown job status {raw:?}").into(),
        )
    })
}
