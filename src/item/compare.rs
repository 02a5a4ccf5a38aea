//! Value comparison helpers shared by the dedup and dataset-comparison
//! nodes.

use serde_json::{Map, Number, Value};

/// Produce a form of the value with deterministic object-key order, so that
/// records can be compared or hashed independently of key insertion order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let canonical_map: Map<String, Value> = pairs
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(canonical_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical string key for hashing a value.
pub fn canonical_key(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

/// Deep equality. With `fuzzy` set, numeric strings compare as numbers and
/// `"true"`/`"false"` strings compare as booleans, so `"1"` matches `1`.
pub fn values_equal(a: &Value, b: &Value, fuzzy: bool) -> bool {
    if fuzzy {
        loosen(a) == loosen(b)
    } else {
        canonicalize(a) == canonicalize(b)
    }
}

fn loosen(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            if let Ok(n) = s.trim().parse::<f64>() {
                return number_value(n);
            }
            match s.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s.clone()),
            }
        }
        Value::Number(n) => number_value(n.as_f64().unwrap_or(0.0)),
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.clone(), loosen(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(loosen).collect()),
        other => other.clone(),
    }
}

/// Convert a float to a JSON number, collapsing whole floats to integers so
/// `3.0` and `3` compare (and render) the same.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Convert a value to f64 for numeric aggregation and watermark keys.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Render a value the way it reads inside a concatenated field.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
