#![forbid(unsafe_code)]

//! SQLite-backed persistent work queue.
//!
//! Every state transition is a single guarded `UPDATE ... WHERE` inside a short
//! transaction, so any number of processes may share one database file. Delivery is
//! at-least-once: a job whose lease expires is handed to the next claimer, and
//! handlers are expected to be idempotent (or lean on the enqueue idempotency key).

mod store;

pub use store::*;
pub use wq_core::model::{JobEventType, JobStatus};
pub use wq_core::{RetryPolicy, compute_backoff_ms};
