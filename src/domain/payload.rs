//! Payload decoding for stored visit records.
//!
//! A stored record carries its ticket details in a `payload` field. Some
//! producers wrote the details as a JSON object string, others wrapped
//! them once more in a nested `data` string. [`decode_payload`] accepts
//! both shapes and never fails: unparseable input is kept verbatim under
//! `rawPayload`.

use serde_json::{Map, Value};

use super::record::RawRecord;

/// Decoded, flattened attribute map of a stored record.
pub type Payload = Map<String, Value>;

/// Record field holding the encoded payload.
pub const PAYLOAD_FIELD: &str = "payload";

/// Payload field that may hold a second JSON-encoded layer.
pub const NESTED_DATA_FIELD: &str = "data";

/// Placeholder key for a payload string that is not valid JSON.
pub const RAW_PAYLOAD_FIELD: &str = "rawPayload";

/// Decodes the `payload` field of a stored hash record.
#[must_use]
pub fn decode_record_payload(record: &RawRecord) -> Payload {
    match record.get(PAYLOAD_FIELD) {
        Some(raw) => decode_payload(Some(&Value::String(raw.clone()))),
        None => Payload::new(),
    }
}

/// Decodes a payload value into a flat attribute map.
///
/// - absent or `null` yields an empty map;
/// - an object is used as-is;
/// - a string is parsed as JSON, falling back to `{ rawPayload: <string> }`;
/// - a string `data` field in the result is parsed once more and its keys
///   merged in, with outer keys winning.
#[must_use]
pub fn decode_payload(value: Option<&Value>) -> Payload {
    let outer = match value {
        None | Some(Value::Null) => return Payload::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => parse_object(raw).unwrap_or_else(|| raw_placeholder(raw)),
        Some(other) => raw_placeholder(&other.to_string()),
    };
    unwrap_nested_data(outer)
}

fn parse_object(raw: &str) -> Option<Payload> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn raw_placeholder(raw: &str) -> Payload {
    let mut map = Payload::new();
    map.insert(RAW_PAYLOAD_FIELD.to_string(), Value::String(raw.to_string()));
    map
}

fn unwrap_nested_data(mut outer: Payload) -> Payload {
    let inner = match outer.get(NESTED_DATA_FIELD) {
        Some(Value::String(raw)) => parse_object(raw),
        _ => None,
    };
    if let Some(inner) = inner {
        for (key, value) in inner {
            outer.entry(key).or_insert(value);
        }
    }
    outer
}

/// Shallow-merges `base` underneath `top`: keys of `top` win, keys only
/// present in `base` are added.
#[must_use]
pub fn merge_payloads(top: &Payload, base: &Payload) -> Payload {
    let mut merged = top.clone();
    for (key, value) in base {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Returns `true` for values that count as "not provided": `null` and
/// blank strings.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Renders a scalar value as trimmed text. Blank values yield `None`.
#[must_use]
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Coerces a value to a finite number. Unparseable input yields `0`.
#[must_use]
pub fn value_as_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if number.is_finite() { number } else { 0.0 }
}
