#![forbid(unsafe_code)]

use serde::Serialize;
use serde_json::Value as JsonValue;
use wq_core::RetryPolicy;
use wq_core::model::{JobEventType, JobStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRow {
    pub job_id: String,
    pub kind: String,
    pub payload: JsonValue,
    pub requester: String,
    /// Empty when the job was enqueued without a key.
    pub idempotency_key: String,
    pub status: JobStatus,
    pub priority: i64,
    pub run_at_ms: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub attempt: u32,
    pub max_attempts: u32,
    pub locked_by: Option<String>,
    pub lease_until_ms: Option<i64>,
    pub last_error: String,
    pub result: Option<JsonValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobEventRow {
    pub seq: i64,
    pub job_id: String,
    pub at_ms: i64,
    pub event_type: JobEventType,
    pub message: String,
    pub attempt: u32,
}

#[derive(Clone, Debug, Default)]
pub struct EnqueueRequest {
    pub kind: String,
    pub payload: JsonValue,
    pub requester: String,
    pub idempotency_key: Option<String>,
    /// Defaults to now; a future value delays the first claim.
    pub run_at_ms: Option<i64>,
    pub priority: Option<i64>,
    pub max_attempts: Option<u32>,
    pub now_ms: Option<i64>,
}

impl EnqueueRequest {
    pub fn new(kind: impl Into<String>, requester: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            requester: requester.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnqueueResult {
    pub job_id: String,
    pub deduped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct JobsListRequest {
    pub requester: Option<String>,
    pub statuses: Vec<JobStatus>,
    pub kinds: Vec<String>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct ClaimRequest {
    pub worker_id: String,
    pub now_ms: Option<i64>,
    pub lease_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ExtendLeaseRequest {
    pub job_id: String,
    pub worker_id: String,
    pub lease_until_ms: i64,
}

#[derive(Clone, Debug, Default)]
pub struct AckRequest {
    pub job_id: String,
    pub worker_id: String,
    pub result: Option<JsonValue>,
    pub now_ms: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct FailRequest {
    pub job_id: String,
    pub worker_id: String,
    pub error: String,
    pub now_ms: Option<i64>,
    pub retry: Option<RetryPolicy>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FailOutcome {
    /// `Queued` when a retry was scheduled, `Failed` when attempts are exhausted.
    pub status: JobStatus,
    /// Next eligible claim time; only set for a scheduled retry.
    pub run_at_ms: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct CancelRequest {
    pub job_id: String,
    pub reason: Option<String>,
    pub now_ms: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PruneRequest {
    pub keep_days: i64,
    pub now_ms: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct JobEventsRequest {
    pub job_id: String,
    pub limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobsStatusCounts {
    pub queued: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
    pub canceled: u64,
}

impl JobsStatusCounts {
    pub fn get(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::Done => self.done,
            JobStatus::Failed => self.failed,
            JobStatus::Canceled => self.canceled,
        }
    }

    pub fn total(&self) -> u64 {
        self.queued + self.running + self.done + self.failed + self.canceled
    }
}
