//! Record sanitizing

use crate::types::JsonValue;

/// Copy of `record` with every string, keys included, reduced to ASCII
/// without NUL bytes. Non-string scalars are unchanged.
pub fn sanitize_record(record: &JsonValue) -> JsonValue {
    match record {
        JsonValue::String(s) => JsonValue::String(sanitize_str(s)),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sanitize_record).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (sanitize_str(k), sanitize_record(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Drop non-ASCII characters and NUL bytes
pub fn sanitize_str(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii() && *c != '\0').collect()
}
