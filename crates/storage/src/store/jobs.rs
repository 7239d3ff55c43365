#![forbid(unsafe_code)]

use super::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{OptionalExtension, Transaction, params, params_from_iter};
use uuid::Uuid;
use wq_core::limits::{DEFAULT_MAX_ATTEMPTS, clamp_list_limit};
use wq_core::model::{JobEventType, JobStatus};

mod claim;
mod complete;
mod housekeeping;

const MAX_JOB_KIND_LEN: usize = 128;
const MAX_REQUESTER_LEN: usize = 256;
const MAX_IDEMPOTENCY_KEY_LEN: usize = 512;
const MAX_WORKER_ID_LEN: usize = 256;
const MAX_ERROR_LEN: usize = 4_000;
const DEFAULT_FAIL_MESSAGE: &str = "job failed";

fn normalize_required(
    raw: &str,
    max_len: usize,
    empty: &'static str,
    too_long: &'static str,
) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(empty));
    }
    if trimmed.len() > max_len {
        return Err(StoreError::InvalidInput(too_long));
    }
    Ok(trimmed.to_string())
}

fn normalize_job_kind(raw: &str) -> Result<String, StoreError> {
    normalize_required(
        raw,
        MAX_JOB_KIND_LEN,
        "job.kind must not be empty",
        "job.kind is too long",
    )
}

fn normalize_requester(raw: &str) -> Result<String, StoreError> {
    normalize_required(
        raw,
        MAX_REQUESTER_LEN,
        "job.requester must not be empty",
        "job.requester is too long",
    )
}

pub(super) fn normalize_worker_id(raw: &str) -> Result<String, StoreError> {
    normalize_required(
        raw,
        MAX_WORKER_ID_LEN,
        "worker_id must not be empty",
        "worker_id is too long",
    )
}

fn normalize_idempotency_key(raw: Option<&str>) -> Result<String, StoreError> {
    let key = raw.map(str::trim).unwrap_or_default();
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(StoreError::InvalidInput("job.idempotency_key is too long"));
    }
    Ok(key.to_string())
}

/// Lookup for a non-empty key. The `<> ''` predicate matches the partial unique index so
/// SQLite can use it; without it the planner falls back to the requester index.
const FIND_BY_IDEMPOTENCY_KEY_SQL: &str =
    "SELECT job_id FROM jobs WHERE requester=?1 AND idempotency_key=?2 AND idempotency_key <> ''";

/// Job ids are never validated: an unknown or blank id is simply "absent".
pub(super) fn normalize_job_id(raw: &str) -> Option<&str> {
    Some(raw.trim()).filter(|s| !s.is_empty())
}

pub(super) fn normalize_error_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_FAIL_MESSAGE.to_string();
    }
    trimmed.chars().take(MAX_ERROR_LEN).collect()
}

fn find_by_idempotency_key_tx(
    tx: &Transaction<'_>,
    requester: &str,
    key: &str,
) -> Result<Option<String>, StoreError> {
    Ok(tx
        .query_row(
            FIND_BY_IDEMPOTENCY_KEY_SQL,
            params![requester, key],
            |row| row.get(0),
        )
        .optional()?)
}

pub(super) fn load_job_tx(
    tx: &Transaction<'_>,
    job_id: &str,
) -> Result<Option<JobRow>, StoreError> {
    Ok(tx
        .query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id=?1"),
            params![job_id],
            read_job_row,
        )
        .optional()?)
}

impl SqliteStore {
    /// Inserts a new `queued` job, or resolves to the existing one when
    /// `(requester, idempotency_key)` was seen before.
    pub fn enqueue(&mut self, request: EnqueueRequest) -> Result<EnqueueResult, StoreError> {
        let kind = normalize_job_kind(&request.kind)?;
        let requester = normalize_requester(&request.requester)?;
        let key = normalize_idempotency_key(request.idempotency_key.as_deref())?;
        let payload_json = encode_json(&request.payload)?;
        let priority = request.priority.unwrap_or(0);
        let max_attempts = request
            .max_attempts
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1);
        let now_ms = request.now_ms.unwrap_or_else(now_ms);
        let run_at_ms = request.run_at_ms.unwrap_or(now_ms);

        let tx = self.write_tx()?;

        if !key.is_empty()
            && let Some(job_id) = find_by_idempotency_key_tx(&tx, &requester, &key)?
        {
            tx.commit()?;
            tracing::debug!(%job_id, %requester, idempotency_key = %key, "enqueue deduped");
            return Ok(EnqueueResult {
                job_id,
                deduped: true,
            });
        }

        let job_id = Uuid::now_v7().to_string();
        let inserted = tx.execute(
            r#"
            INSERT INTO jobs(
              job_id, kind, payload_json, requester, idempotency_key, status, priority,
              run_at, created_at, updated_at, attempt, max_attempts, locked_by, lease_until,
              last_error, result_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'queued', ?6, ?7, ?8, ?8, 0, ?9, NULL, NULL, '', NULL)
            "#,
            params![
                job_id.as_str(),
                kind.as_str(),
                payload_json,
                requester.as_str(),
                key.as_str(),
                priority,
                run_at_ms,
                now_ms,
                max_attempts,
            ],
        );

        match inserted.map_err(StoreError::from) {
            Ok(_) => {}
            Err(err) if !key.is_empty() && err.is_constraint_violation() => {
                // Backstop only: the IMMEDIATE tx already serializes lookup and insert for
                // store callers; this covers raw connections or other non-IMMEDIATE writers.
                let Some(winner) = find_by_idempotency_key_tx(&tx, &requester, &key)? else {
                    return Err(err);
                };
                tx.commit()?;
                tracing::debug!(job_id = %winner, %requester, idempotency_key = %key, "enqueue lost insert race, deduped");
                return Ok(EnqueueResult {
                    job_id: winner,
                    deduped: true,
                });
            }
            Err(err) => return Err(err),
        }

        insert_job_event_tx(&tx, &job_id, now_ms, JobEventType::Enqueue, &kind, 0)?;
        tx.commit()?;

        tracing::info!(%job_id, %kind, %requester, priority, run_at_ms, max_attempts, "job enqueued");
        Ok(EnqueueResult {
            job_id,
            deduped: false,
        })
    }

    /// Full job record, or `None` for a blank or unknown id.
    pub fn get(&self, job_id: &str) -> Result<Option<JobRow>, StoreError> {
        let Some(job_id) = normalize_job_id(job_id) else {
            return Ok(None);
        };
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id=?1"),
                params![job_id],
                read_job_row,
            )
            .optional()?)
    }

    /// Newest first (`created_at DESC, job_id DESC`), at most `limit` rows.
    pub fn list(&self, request: JobsListRequest) -> Result<Vec<JobRow>, StoreError> {
        let limit = clamp_list_limit(request.limit);

        let mut sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE 1=1");
        let mut args = Vec::<SqlValue>::new();

        if let Some(requester) = request
            .requester
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            args.push(SqlValue::Text(requester.to_string()));
            sql.push_str(&format!(" AND requester=?{}", args.len()));
        }

        if !request.statuses.is_empty() {
            let mut placeholders = Vec::with_capacity(request.statuses.len());
            for status in &request.statuses {
                args.push(SqlValue::Text(status.as_str().to_string()));
                placeholders.push(format!("?{}", args.len()));
            }
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(",")));
        }

        let kinds = request
            .kinds
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>();
        if !kinds.is_empty() {
            let mut placeholders = Vec::with_capacity(kinds.len());
            for kind in kinds {
                args.push(SqlValue::Text(kind.to_string()));
                placeholders.push(format!("?{}", args.len()));
            }
            sql.push_str(&format!(" AND kind IN ({})", placeholders.join(",")));
        }

        args.push(SqlValue::Integer(limit as i64));
        sql.push_str(&format!(
            " ORDER BY created_at DESC, job_id DESC LIMIT ?{}",
            args.len()
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params_from_iter(args), read_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Audit trail for one job, oldest first.
    pub fn job_events(&self, request: JobEventsRequest) -> Result<Vec<JobEventRow>, StoreError> {
        let Some(job_id) = normalize_job_id(&request.job_id) else {
            return Ok(Vec::new());
        };
        let limit = clamp_list_limit(request.limit);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {JOB_EVENT_COLUMNS} FROM job_events WHERE job_id=?1 ORDER BY seq ASC LIMIT ?2"
        ))?;
        let events = stmt
            .query_map(params![job_id, limit as i64], read_job_event_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn status_counts(&self) -> Result<JobsStatusCounts, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
        let mut rows = stmt.query([])?;
        let mut counts = JobsStatusCounts::default();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let count = row.get::<_, i64>(1)?.max(0) as u64;
            match parse_status(0, &raw)? {
                JobStatus::Queued => counts.queued = count,
                JobStatus::Running => counts.running = count,
                JobStatus::Done => counts.done = count,
                JobStatus::Failed => counts.failed = count,
                JobStatus::Canceled => counts.canceled = count,
            }
        }
        Ok(counts)
    }
}
