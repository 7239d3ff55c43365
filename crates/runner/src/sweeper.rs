#![forbid(unsafe_code)]

use crate::{RunnerError, sleep_unless_stopped};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use wq_storage::{PruneRequest, SqliteStore};

/// Periodic retention sweep over terminal jobs.
pub struct Sweeper {
    store: SqliteStore,
    keep_days: i64,
}

impl Sweeper {
    pub fn new(store: SqliteStore, keep_days: i64) -> Self {
        Self { store, keep_days }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn sweep_once(&mut self) -> Result<usize, RunnerError> {
        let removed = self.store.prune(PruneRequest {
            keep_days: self.keep_days,
            now_ms: None,
        })?;
        info!(removed, keep_days = self.keep_days, "prune sweep finished");
        Ok(removed)
    }

    /// Sweeps immediately, then every `every` until `stop` is set.
    pub fn run(&mut self, every: Duration, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if let Err(err) = self.sweep_once() {
                warn!(error = %err, "prune sweep failed");
            }
            sleep_unless_stopped(every, stop);
        }
    }
}
