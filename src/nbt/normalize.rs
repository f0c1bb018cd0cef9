use serde_json::{Map, Number, Value};

use super::tag::{Tag, TagKind};

/// Strip kind information from a tag tree, leaving plain JSON values.
pub fn normalize_tag(tag: &Tag) -> Value {
    match tag {
        Tag::End => Value::Null,
        Tag::Byte(v) => Value::from(*v),
        Tag::Short(v) => Value::from(*v),
        Tag::Int(v) => Value::from(*v),
        Tag::Long(v) => Value::from(*v),
        Tag::Float(v) => float(f64::from(*v)),
        Tag::Double(v) => float(*v),
        Tag::String(v) => Value::String(v.clone()),
        Tag::ByteArray(values) => values.iter().map(|&v| Value::from(v)).collect(),
        Tag::IntArray(values) => values.iter().map(|&v| Value::from(v)).collect(),
        Tag::LongArray(values) => values.iter().map(|&v| Value::from(v)).collect(),
        Tag::List(_, items) => items.iter().map(normalize_tag).collect(),
        Tag::Compound(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (name, child) in entries {
                map.insert(name.clone(), normalize_tag(child));
            }
            collapse(map)
        }
    }
}

/// Normalize a value that may still contain wrapped `{"type", "value"}`
/// nodes, at any depth. Already-plain input comes back unchanged.
pub fn normalize(value: &Value) -> Value {
    if let Some(inner) = unwrap_tag(value) {
        return normalize(inner);
    }
    match value {
        Value::Array(items) => items.iter().map(normalize).collect(),
        Value::Object(map) => collapse(
            map.iter()
                .map(|(key, child)| (key.clone(), normalize(child)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Finish an object whose children are already normalized. If the result
/// has the wrapped shape it is unwrapped here, so every output is a fixed
/// point of [`normalize`].
fn collapse(map: Map<String, Value>) -> Value {
    let object = Value::Object(map);
    match unwrap_tag(&object) {
        Some(inner) => inner.clone(),
        None => object,
    }
}

/// Recognizes a wrapped tag: an object with exactly the keys `type` and
/// `value`, where `type` names a known tag kind.
fn unwrap_tag(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    if map.len() != 2 {
        return None;
    }
    let kind = map.get("type")?.as_str()?;
    TagKind::from_name(kind)?;
    map.get("value")
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
