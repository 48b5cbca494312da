//! Lenient field decoders for backend payloads.
//!
//! The backend is not consistent about scalar encodings: flags arrive as
//! `true`, `1` or `"1"`, ids as numbers or numeric strings.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;
use serde_json::Value;

/// Decodes a boolean that may be sent as bool, number or string.
///
/// `null` and a missing field (with `#[serde(default)]`) decode as `false`.
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" => Ok(false),
            "1" | "true" | "yes" => Ok(true),
            other => Err(de::Error::invalid_value(
                Unexpected::Str(other),
                &"a boolean-like value",
            )),
        },
        other => Err(de::Error::invalid_type(
            Unexpected::Other(&other.to_string()),
            &"a boolean-like value",
        )),
    }
}

/// Decodes an integer id that may be sent as a number or numeric string.
pub fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| de::Error::custom(format!("invalid id: {value}")))
}

/// Optional variant of [`flexible_id`].
pub fn flexible_opt_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    id_from_value(&value)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid id: {value}")))
}

fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
