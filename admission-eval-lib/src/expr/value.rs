//! Conversion between plain documents and interpreter values

use super::library::handle_text;
use crate::authz::node_kind;
use cel_interpreter::Value;
use cel_interpreter::objects::{Key, Map};
use serde_json::{Number, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Convert a plain document into an interpreter value
pub fn to_cel(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => Value::String(Arc::new(s.clone())),
        JsonValue::Array(items) => Value::List(Arc::new(items.iter().map(to_cel).collect())),
        JsonValue::Object(fields) => {
            let map: HashMap<Arc<String>, Value> = fields.iter().map(|(k, v)| (Arc::new(k.clone()), to_cel(v))).collect();
            Value::Map(Map::from(map))
        }
    }
}

/// Convert an interpreter value into a plain document for reporting
///
/// # Errors
///
/// Returns a message when the value has no document representation (authorizer
/// nodes, functions, non-finite doubles). Quantities and URLs render as the
/// text they were created from.
pub fn to_json(value: &Value) -> Result<JsonValue, String> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Bool(b) => Ok(JsonValue::Bool(*b)),
        Value::Int(i) => Ok(JsonValue::from(*i)),
        Value::UInt(u) => Ok(JsonValue::from(*u)),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| format!("type conversion error from 'double' value {f} to JSON")),
        Value::String(s) => Ok(JsonValue::String(s.to_string())),
        Value::Bytes(b) => Ok(JsonValue::String(String::from_utf8_lossy(b).into_owned())),
        Value::List(items) => items.iter().map(to_json).collect::<Result<Vec<_>, _>>().map(JsonValue::Array),
        Value::Map(map) => {
            if let Some(kind) = node_kind(map) {
                return Err(format!("type conversion error from '{kind}' to JSON"));
            }
            if let Some(text) = handle_text(map) {
                return Ok(JsonValue::String(text));
            }

            let mut fields = serde_json::Map::with_capacity(map.map.len());
            for (key, item) in map.map.iter() {
                let _ = fields.insert(key_to_string(key), to_json(item)?);
            }
            Ok(JsonValue::Object(fields))
        }
        Value::Timestamp(ts) => Ok(JsonValue::String(ts.to_rfc3339())),
        Value::Duration(d) => Ok(JsonValue::String(format!("{}s", d.num_seconds()))),
        other => Err(format!("type conversion error from '{other:?}' to JSON")),
    }
}

fn key_to_string(key: &Key) -> String {
    match key {
        Key::Int(i) => i.to_string(),
        Key::Uint(u) => u.to_string(),
        Key::Bool(b) => b.to_string(),
        Key::String(s) => s.to_string(),
    }
}

/// Look up a string-keyed member of a map value
pub fn map_member<'a>(map: &'a Map, name: &str) -> Option<&'a Value> {
    map.map.get(&Key::String(Arc::new(name.to_string())))
}
