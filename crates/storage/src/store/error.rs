#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Caller misuse (missing kind/requester/worker id). Raised before any SQL runs.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unsupported schema version (found={found}, expected<={expected})")]
    SchemaVersion { found: i64, expected: i64 },
}

impl StoreError {
    /// True for a violated UNIQUE/PK/CHECK constraint, i.e. a lost insert race.
    pub(in crate::store) fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sql(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
