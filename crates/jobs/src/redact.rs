// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parameter redaction for read endpoints. Applied only at read
//! time — the in-memory job record always carries the real values so the
//! worker can actually perform the operation; [`redact`] is called by
//! [`crate::service::JobService::get`]/`list` just before handing a clone
//! to the caller.

use hvfleet_core::{REDACTED_PLACEHOLDER, SENSITIVE_FIELD_MARKERS};
use serde_json::Value;

fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_FIELD_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Recursively redact any object field whose name matches one of
/// [`SENSITIVE_FIELD_MARKERS`] (case-insensitive substring). Arrays are
/// walked element-wise; scalars pass through unchanged. Idempotent:
/// `redact(redact(v)) == redact(v)`, since a redacted value is already the
/// fixed placeholder string and matching field names stay matched.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                if is_sensitive_field(key) {
                    out.insert(key.clone(), Value::String(REDACTED_PLACEHOLDER.to_string()));
                } else {
                    out.insert(key.clone(), redact(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Best-effort redaction entry point for a whole parameters blob:
/// "if redaction throws, the response parameters are emptied rather than
/// leaked". [`redact`] itself can't fail (plain recursive pattern match),
/// but this wrapper is the boundary a future fallible redaction strategy
/// would plug into without changing callers.
pub fn redact_or_empty(value: &Value) -> Value {
    std::panic::catch_unwind(|| redact(value)).unwrap_or(Value::Object(serde_json::Map::new()))
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
