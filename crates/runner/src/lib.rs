#![forbid(unsafe_code)]

//! Worker-side driver for the job store: a polling worker loop and a prune sweeper.

mod config;
mod error;
pub mod logging;
mod sweeper;
mod worker;

pub use config::{RunnerConfig, parse_args_from, usage};
pub use error::RunnerError;
pub use sweeper::Sweeper;
pub use worker::{AckImmediately, JobContext, JobHandler, RunOutcome, Worker, WorkerOptions};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(200);

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis()
        .min(i64::MAX as u128) as i64
}

/// Sleeps for `total`, waking early once `stop` is set.
pub(crate) fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(STOP_CHECK_INTERVAL);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
