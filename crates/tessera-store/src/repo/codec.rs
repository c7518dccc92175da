//! Text encodings of keys and values as stored in SQLite
//!
//! Values are stored as serde-tagged JSON so every variant (including
//! `Null` and timestamps) reads back exactly as written.

#![allow(clippy::result_large_err)]

use crate::errors::{serialization_error, Result};
use tessera_core::{KeyTuple, Value};

/// Stable text form of a key tuple, used as the `row_key` column
pub fn encode_key(key: &KeyTuple) -> Result<String> {
    serde_json::to_string(key).map_err(|e| serialization_error("encode_key", e))
}

pub fn decode_key(encoded: &str) -> Result<KeyTuple> {
    serde_json::from_str(encoded).map_err(|e| serialization_error("decode_key", e))
}

pub fn encode_value(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| serialization_error("encode_value", e))
}

pub fn decode_value(encoded: &str) -> Result<Value> {
    serde_json::from_str(encoded).map_err(|e| serialization_error("decode_value", e))
}

/// Untagged JSON rendering for people (CLI output), not for round trips
pub fn to_plain_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
    }
}
