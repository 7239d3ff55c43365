#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETRY_BASE_MS: u64 = 5_000;
pub const DEFAULT_RETRY_MAX_MS: u64 = 3_600_000;

/// Retry delay bounds used when a failed job still has attempts left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: DEFAULT_RETRY_BASE_MS,
            max_ms: DEFAULT_RETRY_MAX_MS,
        }
    }
}

/// Exponential backoff: `base_ms * 2^(attempt - 1)`, floored at `base_ms` and capped at `max_ms`.
///
/// `attempt` is the number of claims the job has had so far, so the first failure
/// waits `base_ms`. A cap below the base is lifted to the base. No jitter is applied;
/// the result is a pure function of its inputs.
pub fn compute_backoff_ms(attempt: u32, policy: RetryPolicy) -> u64 {
    let base = policy.base_ms.max(1);
    let cap = policy.max_ms.max(base);
    let exponent = attempt.max(1) - 1;
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    base.saturating_mul(factor).clamp(base, cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_waits_base() {
        let policy = RetryPolicy {
            base_ms: 1_000,
            max_ms: 60_000,
        };
        assert_eq!(compute_backoff_ms(0, policy), 1_000);
        assert_eq!(compute_backoff_ms(1, policy), 1_000);
        assert_eq!(compute_backoff_ms(2, policy), 2_000);
        assert_eq!(compute_backoff_ms(3, policy), 4_000);
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let policy = RetryPolicy {
            base_ms: 750,
            max_ms: 30_000,
        };
        let mut prev = 0;
        for attempt in 0..200 {
            let delay = compute_backoff_ms(attempt, policy);
            assert!(delay >= prev, "attempt {attempt}: {delay} < {prev}");
            assert!((750..=30_000).contains(&delay));
            prev = delay;
        }
        assert_eq!(compute_backoff_ms(199, policy), 30_000);
    }

    #[test]
    fn inverted_bounds_collapse_to_base() {
        let policy = RetryPolicy {
            base_ms: 10_000,
            max_ms: 10,
        };
        assert_eq!(compute_backoff_ms(1, policy), 10_000);
        assert_eq!(compute_backoff_ms(9, policy), 10_000);
    }

    #[test]
    fn zero_base_still_delays() {
        let policy = RetryPolicy {
            base_ms: 0,
            max_ms: 0,
        };
        assert_eq!(compute_backoff_ms(4, policy), 1);
    }
}
