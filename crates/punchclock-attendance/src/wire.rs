//! Decoding of backend record values.
//!
//! Unset fields arrive as `false`, many-to-one links as `[id, "display name"]`.

use chrono::{DateTime, Utc};
use punchclock_core::time::parse_backend_timestamp;
use punchclock_core::types::AttendanceRecord;
use serde_json::Value;

use crate::error::RpcError;

/// Id of a many-to-one field: `[id, name]`, a bare id, or `false`.
pub(crate) fn many2one_id(value: &Value) -> Option<i64> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_i64),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

pub(crate) fn record_id(record: &Value) -> Result<i64, RpcError> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcError::Malformed(format!("record without id: {record}")))
}

fn optional_timestamp(record: &Value, field: &str) -> Result<Option<DateTime<Utc>>, RpcError> {
    match record.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(raw)) => parse_backend_timestamp(raw)
            .map(Some)
            .ok_or_else(|| RpcError::Malformed(format!("bad {field} timestamp: {raw}"))),
        Some(other) => Err(RpcError::Malformed(format!("bad {field} value: {other}"))),
    }
}

pub(crate) fn attendance_from_value(record: &Value) -> Result<AttendanceRecord, RpcError> {
    let id = record_id(record)?;
    let check_in = optional_timestamp(record, "check_in")?
        .ok_or_else(|| RpcError::Malformed(format!("attendance {id} has no check_in")))?;
    let check_out = optional_timestamp(record, "check_out")?;
    Ok(AttendanceRecord {
        id,
        check_in,
        check_out,
    })
}
