#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;
use wq_storage::{EnqueueRequest, SqliteStore};

/// Fixed clock origin so timestamps in assertions are readable.
pub const T0: i64 = 1_700_000_000_000;

pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("queue.db");
        Self { _dir: dir, path }
    }

    pub fn open(&self) -> SqliteStore {
        SqliteStore::open(&self.path).expect("open store")
    }
}

pub fn enqueue_at(store: &mut SqliteStore, kind: &str, now_ms: i64) -> String {
    enqueue_with(store, kind, now_ms, |_| {})
}

pub fn enqueue_with(
    store: &mut SqliteStore,
    kind: &str,
    now_ms: i64,
    configure: impl FnOnce(&mut EnqueueRequest),
) -> String {
    let mut request = EnqueueRequest::new(kind, "tests");
    request.now_ms = Some(now_ms);
    configure(&mut request);
    store.enqueue(request).expect("enqueue").job_id
}
