use serde_json::Value;

use crate::error::{CaptureError, Result};

/// A three-component position read from a save file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Pull an `x, y, z` triple out of the top level of a normalized tree.
///
/// `primary` is tried first, then `fallback` (a `null` counts as absent).
/// A node carrying a nested `value` is unwrapped once, then either a
/// sequence of at least three numbers or a map keyed `"0"`, `"1"`, `"2"`
/// is accepted.
pub fn extract_vector3(tree: &Value, primary: &str, fallback: &str) -> Result<Position> {
    let (field, node) = [primary, fallback]
        .into_iter()
        .find_map(|key| match tree.get(key) {
            Some(Value::Null) | None => None,
            Some(node) => Some((key, node)),
        })
        .ok_or_else(|| CaptureError::FieldMissing {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
        })?;

    let container = unwrap_value(node);
    let component = |index: usize| -> Option<f64> {
        let entry = match container {
            Value::Array(items) => items.get(index),
            Value::Object(map) => map.get(&index.to_string()),
            _ => None,
        };
        entry.and_then(Value::as_f64)
    };

    match (component(0), component(1), component(2)) {
        (Some(x), Some(y), Some(z)) => Ok(Position { x, y, z }),
        _ => Err(CaptureError::FieldType {
            field: field.to_string(),
        }),
    }
}

fn unwrap_value(node: &Value) -> &Value {
    match node {
        Value::Object(map) => map.get("value").unwrap_or(node),
        _ => node,
    }
}
