//! Deserializers for commerce payloads where numbers arrive as strings and
//! strings arrive as numbers, depending on whether the model or the store
//! produced the JSON.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value_to_text(&value)))
}

pub fn u64_value<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_u64(&value)
        .ok_or_else(|| D::Error::custom(format!("expected an integer or numeric string, got {value}")))
}

pub fn u32_value<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_u64(&value)
        .and_then(|number| u32::try_from(number).ok())
        .ok_or_else(|| D::Error::custom(format!("expected a quantity, got {value}")))
}

pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(value) => parse_u64(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer id, got {value}"))),
    }
}

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_u64).and_then(|number| u32::try_from(number).ok()))
}

pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    }
}
