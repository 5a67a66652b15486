//! Lenient field decoders for remote tree payloads
//!
//! The remote endpoints are not consistent about scalar types: ids show up as
//! strings on one page and as numbers on another.

use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decodes a string field that may arrive as a JSON number or `null`
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Decodes a numeric tracker id that may arrive quoted
pub(crate) fn tracker_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("tracker id {} is not an integer", n))),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("tracker id '{}' is not an integer", s))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!(
            "expected numeric tracker id, got {}",
            other
        ))),
    }
}

/// Decodes a child list, treating `null`, booleans and other non-lists as empty
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => serde_json::from_value(Value::Array(items)).map_err(D::Error::custom),
        _ => Ok(Vec::new()),
    }
}
