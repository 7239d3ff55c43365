#![forbid(unsafe_code)]

pub mod backoff;

pub use backoff::{RetryPolicy, compute_backoff_ms};

pub mod model {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum JobStatus {
        Queued,
        Running,
        Done,
        Failed,
        Canceled,
    }

    impl JobStatus {
        pub const ALL: [JobStatus; 5] = [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Failed,
            JobStatus::Canceled,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                JobStatus::Queued => "queued",
                JobStatus::Running => "running",
                JobStatus::Done => "done",
                JobStatus::Failed => "failed",
                JobStatus::Canceled => "canceled",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            let value = value.trim();
            Self::ALL
                .into_iter()
                .find(|status| status.as_str().eq_ignore_ascii_case(value))
        }

        /// `done`, `failed` and `canceled` are final: nothing moves a job out of them.
        pub fn is_terminal(self) -> bool {
            matches!(
                self,
                JobStatus::Done | JobStatus::Failed | JobStatus::Canceled
            )
        }
    }

    impl std::fmt::Display for JobStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum JobEventType {
        Enqueue,
        Claim,
        Ack,
        Retry,
        Fail,
        Cancel,
    }

    impl JobEventType {
        pub const ALL: [JobEventType; 6] = [
            JobEventType::Enqueue,
            JobEventType::Claim,
            JobEventType::Ack,
            JobEventType::Retry,
            JobEventType::Fail,
            JobEventType::Cancel,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                JobEventType::Enqueue => "enqueue",
                JobEventType::Claim => "claim",
                JobEventType::Ack => "ack",
                JobEventType::Retry => "retry",
                JobEventType::Fail => "fail",
                JobEventType::Cancel => "cancel",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            let value = value.trim();
            Self::ALL
                .into_iter()
                .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
        }
    }

    impl std::fmt::Display for JobEventType {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.as_str())
        }
    }
}

pub mod limits {
    pub const DAY_MS: i64 = 86_400_000;

    pub const DEFAULT_LEASE_MS: u64 = 120_000;
    pub const MIN_LEASE_MS: u64 = 5_000;
    pub const MAX_LEASE_MS: u64 = 3_600_000;

    pub const DEFAULT_LIST_LIMIT: usize = 50;
    pub const MAX_LIST_LIMIT: usize = 500;

    pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

    pub fn clamp_lease_ms(raw: Option<u64>) -> u64 {
        raw.unwrap_or(DEFAULT_LEASE_MS)
            .clamp(MIN_LEASE_MS, MAX_LEASE_MS)
    }

    pub fn clamp_list_limit(raw: Option<usize>) -> usize {
        raw.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }

    /// Negative retention windows collapse to zero (prune everything terminal created before now).
    pub fn retention_cutoff_ms(now_ms: i64, keep_days: i64) -> i64 {
        let keep_days = keep_days.max(0);
        now_ms.saturating_sub(keep_days.saturating_mul(DAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::limits::*;
    use super::model::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse(" RUNNING "), Some(JobStatus::Running));
        assert_eq!(JobStatus::parse("pending"), None);
    }

    #[test]
    fn only_done_failed_canceled_are_terminal() {
        let terminal = JobStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect::<Vec<_>>();
        assert_eq!(
            terminal,
            vec![JobStatus::Done, JobStatus::Failed, JobStatus::Canceled]
        );
    }

    #[test]
    fn event_type_parse_rejects_unknown() {
        assert_eq!(JobEventType::parse("retry"), Some(JobEventType::Retry));
        assert_eq!(JobEventType::parse("heartbeat"), None);
    }

    #[test]
    fn lease_is_clamped_into_window() {
        assert_eq!(clamp_lease_ms(None), DEFAULT_LEASE_MS);
        assert_eq!(clamp_lease_ms(Some(1)), MIN_LEASE_MS);
        assert_eq!(clamp_lease_ms(Some(u64::MAX)), MAX_LEASE_MS);
        assert_eq!(clamp_lease_ms(Some(30_000)), 30_000);
    }

    #[test]
    fn list_limit_is_clamped() {
        assert_eq!(clamp_list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_list_limit(Some(0)), 1);
        assert_eq!(clamp_list_limit(Some(10_000)), MAX_LIST_LIMIT);
    }

    #[test]
    fn retention_cutoff_never_moves_into_the_future() {
        assert_eq!(retention_cutoff_ms(1_000, 0), 1_000);
        assert_eq!(retention_cutoff_ms(1_000, -5), 1_000);
        assert_eq!(retention_cutoff_ms(3 * DAY_MS, 2), DAY_MS);
    }

    #[test]
    fn status_serializes_lowercase() {
        let raw = serde_json::to_string(&JobStatus::Canceled).expect("serialize");
        assert_eq!(raw, "\"canceled\"");
    }
}
