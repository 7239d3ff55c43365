#![forbid(unsafe_code)]

use crate::{RunnerError, now_ms, sleep_unless_stopped};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use wq_core::RetryPolicy;
use wq_core::limits::DEFAULT_LEASE_MS;
use wq_storage::{
    AckRequest, ClaimRequest, ExtendLeaseRequest, FailRequest, JobRow, JobStatus, SqliteStore,
};

/// Executes claimed jobs.
///
/// `Ok(result)` acks the job with `result`; `Err(message)` fails the attempt and
/// lets the store decide between a backoff retry and terminal failure.
pub trait JobHandler {
    fn handle(&mut self, ctx: &mut JobContext<'_>) -> Result<Option<JsonValue>, String>;
}

impl<F> JobHandler for F
where
    F: FnMut(&mut JobContext<'_>) -> Result<Option<JsonValue>, String>,
{
    fn handle(&mut self, ctx: &mut JobContext<'_>) -> Result<Option<JsonValue>, String> {
        self(ctx)
    }
}

/// Drain handler: marks every job done without running it.
#[derive(Clone, Copy, Debug, Default)]
pub struct AckImmediately;

impl JobHandler for AckImmediately {
    fn handle(&mut self, ctx: &mut JobContext<'_>) -> Result<Option<JsonValue>, String> {
        debug!(job_id = %ctx.job().job_id, kind = %ctx.job().kind, "drain ack: completed without running");
        Ok(Some(json!({ "drained": true })))
    }
}

/// What a handler sees of the job it is running, plus lease upkeep.
pub struct JobContext<'a> {
    store: &'a mut SqliteStore,
    job: JobRow,
    worker_id: &'a str,
    lease_ms: u64,
    heartbeat_ms: u64,
    last_beat_ms: i64,
    lost: bool,
}

impl<'a> JobContext<'a> {
    pub fn job(&self) -> &JobRow {
        &self.job
    }

    pub fn payload(&self) -> &JsonValue {
        &self.job.payload
    }

    /// Pushes the lease forward by one lease length.
    ///
    /// Returns `Ok(false)` once the lease is gone (expired and reclaimed, or the
    /// job was canceled); the handler should stop work at that point.
    pub fn heartbeat(&mut self) -> Result<bool, RunnerError> {
        if self.lost {
            return Ok(false);
        }
        let now = now_ms();
        let extended = self.store.extend_lease(ExtendLeaseRequest {
            job_id: self.job.job_id.clone(),
            worker_id: self.worker_id.to_string(),
            lease_until_ms: now.saturating_add(self.lease_ms as i64),
        })?;
        self.last_beat_ms = now;
        if !extended {
            warn!(job_id = %self.job.job_id, "lease lost");
            self.lost = true;
        }
        Ok(extended)
    }

    /// Heartbeats only when the heartbeat interval has elapsed since the last one.
    pub fn maybe_heartbeat(&mut self) -> Result<bool, RunnerError> {
        if self.lost {
            return Ok(false);
        }
        if now_ms().saturating_sub(self.last_beat_ms) < self.heartbeat_ms as i64 {
            return Ok(true);
        }
        self.heartbeat()
    }

    /// True when this worker no longer holds the job.
    pub fn is_canceled(&mut self) -> Result<bool, RunnerError> {
        if self.lost {
            return Ok(true);
        }
        let held = self.store.get(&self.job.job_id)?.is_some_and(|job| {
            job.status == JobStatus::Running && job.locked_by.as_deref() == Some(self.worker_id)
        });
        if !held {
            self.lost = true;
        }
        Ok(!held)
    }
}

#[derive(Clone, Debug)]
pub struct WorkerOptions {
    pub worker_id: String,
    pub lease_ms: u64,
    pub heartbeat_ms: u64,
    pub poll: Duration,
    pub retry: RetryPolicy,
}

impl WorkerOptions {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            lease_ms: DEFAULT_LEASE_MS,
            heartbeat_ms: DEFAULT_LEASE_MS / 3,
            poll: Duration::from_millis(1_500),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was eligible.
    Idle,
    Acked { job_id: String },
    Retried { job_id: String, run_at_ms: i64 },
    Failed { job_id: String },
    /// The job was canceled or reclaimed while the handler ran; its result was discarded.
    Lost { job_id: String },
}

pub struct Worker {
    store: SqliteStore,
    options: WorkerOptions,
}

impl Worker {
    pub fn new(store: SqliteStore, options: WorkerOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub fn into_store(self) -> SqliteStore {
        self.store
    }

    /// Claims at most one job, runs it through `handler`, and reports it back.
    pub fn run_once(&mut self, handler: &mut impl JobHandler) -> Result<RunOutcome, RunnerError> {
        let worker_id = self.options.worker_id.as_str();
        let Some(job) = self.store.claim_next(ClaimRequest {
            worker_id: worker_id.to_string(),
            now_ms: None,
            lease_ms: Some(self.options.lease_ms),
        })?
        else {
            return Ok(RunOutcome::Idle);
        };

        let job_id = job.job_id.clone();
        info!(job_id = %job_id, kind = %job.kind, attempt = job.attempt, "job started");

        let mut ctx = JobContext {
            store: &mut self.store,
            job,
            worker_id,
            lease_ms: self.options.lease_ms,
            heartbeat_ms: self.options.heartbeat_ms,
            last_beat_ms: now_ms(),
            lost: false,
        };
        let handled = handler.handle(&mut ctx);
        drop(ctx);

        let outcome = match handled {
            Ok(result) => {
                let acked = self.store.ack(AckRequest {
                    job_id: job_id.clone(),
                    worker_id: worker_id.to_string(),
                    result,
                    now_ms: None,
                })?;
                if acked {
                    RunOutcome::Acked { job_id }
                } else {
                    RunOutcome::Lost { job_id }
                }
            }
            Err(error) => {
                let failed = self.store.fail(FailRequest {
                    job_id: job_id.clone(),
                    worker_id: worker_id.to_string(),
                    error,
                    now_ms: None,
                    retry: Some(self.options.retry),
                })?;
                match failed {
                    Some(outcome) => match outcome.run_at_ms {
                        Some(run_at_ms) if outcome.status == JobStatus::Queued => {
                            RunOutcome::Retried { job_id, run_at_ms }
                        }
                        _ => RunOutcome::Failed { job_id },
                    },
                    None => RunOutcome::Lost { job_id },
                }
            }
        };

        match &outcome {
            RunOutcome::Lost { job_id } => {
                warn!(job_id = %job_id, "job no longer held by this worker; outcome discarded")
            }
            other => info!(outcome = ?other, "job finished"),
        }
        Ok(outcome)
    }

    /// Polls until `stop` is set. Store errors are logged and retried after one poll interval.
    pub fn run(&mut self, handler: &mut impl JobHandler, stop: &AtomicBool) {
        info!(worker_id = %self.options.worker_id, "worker started");
        while !stop.load(Ordering::Relaxed) {
            match self.run_once(handler) {
                Ok(RunOutcome::Idle) => sleep_unless_stopped(self.options.poll, stop),
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "worker iteration failed");
                    sleep_unless_stopped(self.options.poll, stop);
                }
            }
        }
        info!(worker_id = %self.options.worker_id, "worker stopped");
    }
}
