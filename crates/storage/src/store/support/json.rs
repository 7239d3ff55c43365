#![forbid(unsafe_code)]

use super::super::StoreError;
use serde_json::Value as JsonValue;

pub(in crate::store) fn encode_json(value: &JsonValue) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Lenient decode for stored payload/result columns.
///
/// A hand-edited or truncated column must not take down `get`/`list` for every other
/// job, so anything unparseable reads back as `null`.
pub(in crate::store) fn decode_json_lenient(job_id: &str, column: &str, raw: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(job_id, column, error = %err, "corrupt json column, reading as null");
            JsonValue::Null
        }
    }
}
