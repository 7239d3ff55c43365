#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS jobs (
          job_id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          payload_json TEXT NOT NULL DEFAULT 'null',
          requester TEXT NOT NULL,
          idempotency_key TEXT NOT NULL DEFAULT '',
          status TEXT NOT NULL
            CHECK (status IN ('queued','running','done','failed','canceled')),
          priority INTEGER NOT NULL DEFAULT 0,
          run_at INTEGER NOT NULL,
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL,
          attempt INTEGER NOT NULL DEFAULT 0,
          max_attempts INTEGER NOT NULL DEFAULT 1,
          locked_by TEXT,
          lease_until INTEGER,
          last_error TEXT NOT NULL DEFAULT '',
          result_json TEXT
        );

        -- Append-only history. Rows go away only together with their job (prune).
        CREATE TABLE IF NOT EXISTS job_events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          job_id TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
          at INTEGER NOT NULL,
          type TEXT NOT NULL,
          message TEXT NOT NULL DEFAULT '',
          attempt INTEGER NOT NULL DEFAULT 0
        );
"#;
