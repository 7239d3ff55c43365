#![forbid(unsafe_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(in crate::store) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis()
        .min(i64::MAX as u128) as i64
}
