#![forbid(unsafe_code)]

use super::*;
use wq_core::limits::clamp_lease_ms;

impl SqliteStore {
    /// Claims the single best eligible job for `worker_id`.
    ///
    /// Eligible means `queued` with `run_at <= now`, or `running` with an expired
    /// lease (the previous holder crashed or stalled). Order is priority DESC,
    /// run_at, created_at, job_id. Returns `None` when nothing is eligible or when
    /// another claimer won the row first; callers simply poll again.
    pub fn claim_next(&mut self, request: ClaimRequest) -> Result<Option<JobRow>, StoreError> {
        let worker_id = normalize_worker_id(&request.worker_id)?;
        let now_ms = request.now_ms.unwrap_or_else(now_ms);
        let lease_ms = clamp_lease_ms(request.lease_ms);
        let lease_until_ms = now_ms.saturating_add(lease_ms as i64);

        let tx = self.write_tx()?;

        let candidate: Option<(String, String, Option<String>)> = tx
            .query_row(
                r#"
                SELECT job_id, status, locked_by
                FROM jobs
                WHERE (status='queued' AND run_at <= ?1)
                   OR (status='running' AND (lease_until IS NULL OR lease_until <= ?1))
                ORDER BY priority DESC, run_at ASC, created_at ASC, job_id ASC
                LIMIT 1
                "#,
                params![now_ms],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((job_id, previous_status, previous_holder)) = candidate else {
            return Ok(None);
        };

        // Same eligibility predicate as the SELECT: the row must still be claimable now.
        let changed = tx.execute(
            r#"
            UPDATE jobs
            SET status='running', locked_by=?2, lease_until=?3, attempt=attempt+1, updated_at=?4
            WHERE job_id=?1
              AND (
                (status='queued' AND run_at <= ?4)
                OR (status='running' AND (lease_until IS NULL OR lease_until <= ?4))
              )
            "#,
            params![job_id.as_str(), worker_id.as_str(), lease_until_ms, now_ms],
        )?;
        if changed != 1 {
            tracing::debug!(%job_id, %worker_id, "claim lost race");
            return Ok(None);
        }

        let Some(job) = load_job_tx(&tx, &job_id)? else {
            return Ok(None);
        };

        let message = if previous_status == JobStatus::Running.as_str() {
            match previous_holder.as_deref().filter(|s| !s.is_empty()) {
                Some(holder) => format!("reclaimed from {holder}: lease expired"),
                None => "reclaimed: lease expired".to_string(),
            }
        } else {
            "claimed".to_string()
        };
        insert_job_event_tx(
            &tx,
            &job_id,
            now_ms,
            JobEventType::Claim,
            &message,
            job.attempt,
        )?;
        tx.commit()?;

        if previous_status == JobStatus::Running.as_str() {
            tracing::info!(
                %job_id,
                %worker_id,
                previous_holder = previous_holder.as_deref().unwrap_or(""),
                attempt = job.attempt,
                "expired lease reclaimed"
            );
        } else {
            tracing::debug!(%job_id, %worker_id, attempt = job.attempt, lease_until_ms, "job claimed");
        }
        Ok(Some(job))
    }

    /// Moves `lease_until` for a job this worker currently holds.
    ///
    /// Returns `false` when the job is unknown, no longer running, or held by
    /// someone else.
    pub fn extend_lease(&mut self, request: ExtendLeaseRequest) -> Result<bool, StoreError> {
        let worker_id = normalize_worker_id(&request.worker_id)?;
        let Some(job_id) = normalize_job_id(&request.job_id) else {
            return Ok(false);
        };

        let changed = self.conn.execute(
            r#"
            UPDATE jobs
            SET lease_until=?3
            WHERE job_id=?1 AND status='running' AND locked_by=?2
            "#,
            params![job_id, worker_id.as_str(), request.lease_until_ms],
        )?;

        let extended = changed == 1;
        tracing::debug!(
            job_id,
            %worker_id,
            lease_until_ms = request.lease_until_ms,
            extended,
            "lease extension"
        );
        Ok(extended)
    }
}
