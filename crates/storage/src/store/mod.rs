#![forbid(unsafe_code)]

mod error;
mod jobs;
mod support;
mod types;

pub use error::StoreError;
pub use types::*;

use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use support::*;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// How long a writer waits for another connection's write lock before giving up.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// The job store: one SQLite connection onto the shared queue file.
///
/// Open one store per thread or process. There is no in-process lock; every
/// multi-step operation runs in its own transaction and every transition is
/// guarded in its `WHERE` clause, so concurrent stores on the same file stay
/// consistent.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(db_path, StoreOptions::default())
    }

    pub fn open_with(db_path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(options.busy_timeout)?;
        migrate_sqlite_schema(&conn)?;

        tracing::debug!(path = %db_path.display(), "job store opened");
        Ok(Self { conn, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Write transactions take the database write lock up front.
    ///
    /// A deferred transaction that reads first and upgrades later can fail with
    /// `SQLITE_BUSY` under WAL without honoring the busy timeout; IMMEDIATE makes
    /// racing writers queue instead.
    fn write_tx(&mut self) -> Result<rusqlite::Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
