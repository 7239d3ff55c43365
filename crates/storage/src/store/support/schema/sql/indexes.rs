#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- Idempotency: one job per (requester, key), only when a key was given.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_requester_idempotency
          ON jobs(requester, idempotency_key)
          WHERE idempotency_key <> '';

        CREATE INDEX IF NOT EXISTS idx_jobs_claim
          ON jobs(status, priority DESC, run_at, created_at, job_id);
        CREATE INDEX IF NOT EXISTS idx_jobs_lease ON jobs(status, lease_until);
        CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at DESC, job_id);
        CREATE INDEX IF NOT EXISTS idx_jobs_requester_created ON jobs(requester, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_job_events_job_seq ON job_events(job_id, seq);
"#;
