#![forbid(unsafe_code)]

use thiserror::Error;
use wq_storage::StoreError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("config: {0}")]
    Config(String),
}
