//! Dot-notation field access on JSON values.
//!
//! Node configs reference record fields with paths like `user.address.city`.
//! Every helper takes a `dot_notation` flag; when it is off the path is one
//! literal object key, which lets records keep keys that contain dots.

use serde_json::{Map, Value};

/// Resolve a path against a value. Array elements can be addressed with
/// numeric segments, e.g. `tags.0`.
pub fn get_path<'a>(value: &'a Value, path: &str, dot_notation: bool) -> Option<&'a Value> {
    if !dot_notation {
        return value.as_object().and_then(|o| o.get(path));
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write a value at a path, creating intermediate objects as needed.
/// Existing non-object values along the path are replaced.
pub fn set_path(value: &mut Value, path: &str, new_value: Value, dot_notation: bool) {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }

    if !dot_notation {
        if let Some(map) = value.as_object_mut() {
            map.insert(path.to_string(), new_value);
        }
        return;
    }

    let segments: Vec<&str> = path.split('.').collect();
    let mut current = value;
    for segment in &segments[..segments.len() - 1] {
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }

    if let Some(map) = current.as_object_mut() {
        map.insert(segments[segments.len() - 1].to_string(), new_value);
    }
}

/// Remove the value at a path, returning it if present.
pub fn remove_path(value: &mut Value, path: &str, dot_notation: bool) -> Option<Value> {
    if !dot_notation {
        return value.as_object_mut().and_then(|o| o.remove(path));
    }

    let segments: Vec<&str> = path.split('.').collect();
    let mut current = value;
    for segment in &segments[..segments.len() - 1] {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current
        .as_object_mut()
        .and_then(|o| o.remove(segments[segments.len() - 1]))
}
