#![forbid(unsafe_code)]

use super::*;
use wq_core::limits::retention_cutoff_ms;

const MAX_CANCEL_REASON_LEN: usize = 400;

impl SqliteStore {
    /// Moves a `queued` or `running` job to `canceled`, whoever holds it.
    ///
    /// Bookkeeping only: a worker already executing the job is not interrupted and
    /// will see its ack/fail rejected. Canceling a terminal job returns `false`.
    pub fn cancel(&mut self, request: CancelRequest) -> Result<bool, StoreError> {
        let Some(job_id) = normalize_job_id(&request.job_id) else {
            return Ok(false);
        };
        let now_ms = request.now_ms.unwrap_or_else(now_ms);
        let message = match request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(reason) => format!(
                "canceled: {}",
                reason
                    .chars()
                    .take(MAX_CANCEL_REASON_LEN)
                    .collect::<String>()
            ),
            None => "canceled".to_string(),
        };

        let tx = self.write_tx()?;
        let changed = tx.execute(
            r#"
            UPDATE jobs
            SET status='canceled', locked_by=NULL, lease_until=NULL, updated_at=?2
            WHERE job_id=?1 AND status IN ('queued','running')
            "#,
            params![job_id, now_ms],
        )?;
        if changed != 1 {
            return Ok(false);
        }

        let attempt: u32 = tx.query_row(
            "SELECT attempt FROM jobs WHERE job_id=?1",
            params![job_id],
            |row| row.get(0),
        )?;
        insert_job_event_tx(&tx, job_id, now_ms, JobEventType::Cancel, &message, attempt)?;
        tx.commit()?;

        tracing::info!(job_id, attempt, "job canceled");
        Ok(true)
    }

    /// Deletes terminal jobs created before `now - keep_days`, with their events.
    ///
    /// `queued` and `running` jobs are never pruned, however old.
    pub fn prune(&mut self, request: PruneRequest) -> Result<usize, StoreError> {
        let now_ms = request.now_ms.unwrap_or_else(now_ms);
        let cutoff_ms = retention_cutoff_ms(now_ms, request.keep_days);

        let tx = self.write_tx()?;
        // Explicit child cleanup; the FK cascade only fires when foreign_keys is on.
        tx.execute(
            r#"
            DELETE FROM job_events
            WHERE job_id IN (
              SELECT job_id FROM jobs
              WHERE created_at < ?1 AND status IN ('done','failed','canceled')
            )
            "#,
            params![cutoff_ms],
        )?;
        let removed = tx.execute(
            r#"
            DELETE FROM jobs
            WHERE created_at < ?1 AND status IN ('done','failed','canceled')
            "#,
            params![cutoff_ms],
        )?;
        tx.commit()?;

        tracing::info!(removed, keep_days = request.keep_days, cutoff_ms, "pruned terminal jobs");
        Ok(removed)
    }
}
