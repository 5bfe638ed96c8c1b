//! Tolerant deserializers for pass-through record fields
//!
//! Names, question types, points and flags are copied into the output as
//! they come. A value of an unexpected JSON type must not fail the whole
//! page, so these helpers read the raw [`Value`] and convert what they can:
//! text fields keep the JSON text of non-string scalars, numeric and flag
//! fields fall back to `None`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Text field: strings as-is, other scalars as their JSON text
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Numeric field: JSON numbers and numeric strings, otherwise `None`
pub fn decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let parsed = match &raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => parse_decimal(s.trim()),
        Some(_) => None,
    };

    if parsed.is_none() {
        debug!("Ignoring non-numeric value {:?}", raw);
    }
    Ok(parsed)
}

/// Boolean field: JSON booleans and "true"/"false" strings, otherwise `None`
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
