#![forbid(unsafe_code)]

use super::*;
use wq_core::compute_backoff_ms;

impl SqliteStore {
    /// Marks a running job `done` and stores its result.
    ///
    /// Only the current lease holder can ack. `false` means the work was superseded
    /// (reclaimed, canceled, already acked) and is not an error.
    pub fn ack(&mut self, request: AckRequest) -> Result<bool, StoreError> {
        let worker_id = normalize_worker_id(&request.worker_id)?;
        let Some(job_id) = normalize_job_id(&request.job_id) else {
            return Ok(false);
        };
        let result_json = request.result.as_ref().map(encode_json).transpose()?;
        let now_ms = request.now_ms.unwrap_or_else(now_ms);

        let tx = self.write_tx()?;
        let changed = tx.execute(
            r#"
            UPDATE jobs
            SET status='done', locked_by=NULL, lease_until=NULL, result_json=?3, updated_at=?4
            WHERE job_id=?1 AND status='running' AND locked_by=?2
            "#,
            params![job_id, worker_id.as_str(), result_json, now_ms],
        )?;
        if changed != 1 {
            tracing::debug!(job_id, %worker_id, "ack ignored: job not held by worker");
            return Ok(false);
        }

        let attempt: u32 = tx.query_row(
            "SELECT attempt FROM jobs WHERE job_id=?1",
            params![job_id],
            |row| row.get(0),
        )?;
        insert_job_event_tx(&tx, job_id, now_ms, JobEventType::Ack, "done", attempt)?;
        tx.commit()?;

        tracing::debug!(job_id, %worker_id, attempt, "job acked");
        Ok(true)
    }

    /// Records a failed attempt.
    ///
    /// With attempts left the job goes back to `queued` with `run_at` pushed out by
    /// the backoff delay; otherwise it becomes `failed`. Returns `None` without
    /// touching the row when the caller no longer holds the job.
    pub fn fail(&mut self, request: FailRequest) -> Result<Option<FailOutcome>, StoreError> {
        let worker_id = normalize_worker_id(&request.worker_id)?;
        let Some(job_id) = normalize_job_id(&request.job_id) else {
            return Ok(None);
        };
        let message = normalize_error_message(&request.error);
        let now_ms = request.now_ms.unwrap_or_else(now_ms);
        let policy = request.retry.unwrap_or_default();

        let tx = self.write_tx()?;

        let current: Option<(String, Option<String>, u32, u32)> = tx
            .query_row(
                "SELECT status, locked_by, attempt, max_attempts FROM jobs WHERE job_id=?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((status, locked_by, attempt, max_attempts)) = current else {
            return Ok(None);
        };
        if status != JobStatus::Running.as_str() || locked_by.as_deref() != Some(worker_id.as_str())
        {
            tracing::debug!(job_id, %worker_id, %status, "fail ignored: job not held by worker");
            return Ok(None);
        }

        let outcome = if attempt < max_attempts {
            let delay_ms = compute_backoff_ms(attempt, policy);
            let run_at_ms = now_ms.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX));
            let changed = tx.execute(
                r#"
                UPDATE jobs
                SET status='queued', run_at=?4, locked_by=NULL, lease_until=NULL,
                    last_error=?5, updated_at=?6
                WHERE job_id=?1 AND status='running' AND locked_by=?2 AND attempt=?3
                "#,
                params![
                    job_id,
                    worker_id.as_str(),
                    attempt,
                    run_at_ms,
                    message.as_str(),
                    now_ms
                ],
            )?;
            if changed != 1 {
                return Ok(None);
            }
            insert_job_event_tx(&tx, job_id, now_ms, JobEventType::Retry, &message, attempt)?;
            tracing::info!(
                job_id,
                %worker_id,
                attempt,
                max_attempts,
                delay_ms,
                error = %message,
                "job failed, retry scheduled"
            );
            FailOutcome {
                status: JobStatus::Queued,
                run_at_ms: Some(run_at_ms),
            }
        } else {
            let changed = tx.execute(
                r#"
                UPDATE jobs
                SET status='failed', locked_by=NULL, lease_until=NULL, last_error=?4, updated_at=?5
                WHERE job_id=?1 AND status='running' AND locked_by=?2 AND attempt=?3
                "#,
                params![job_id, worker_id.as_str(), attempt, message.as_str(), now_ms],
            )?;
            if changed != 1 {
                return Ok(None);
            }
            insert_job_event_tx(&tx, job_id, now_ms, JobEventType::Fail, &message, attempt)?;
            tracing::info!(
                job_id,
                %worker_id,
                attempt,
                max_attempts,
                error = %message,
                "job failed, attempts exhausted"
            );
            FailOutcome {
                status: JobStatus::Failed,
                run_at_ms: None,
            }
        };

        tx.commit()?;
        Ok(Some(outcome))
    }
}
