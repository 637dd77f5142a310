//! Lenient field coercions shared by the snapshot reader and the admin API.
//!
//! Upstream payloads are loosely typed: counts may arrive as numbers, numeric
//! strings, empty strings or `null`, and dates may be missing, `null` or in the
//! wrong shape. None of these are errors, they all collapse to `None`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date. Anything else, including non-string JSON, is `None`.
pub fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
        _ => None,
    }
}

/// Reads a non-negative count. Whole floats such as `30.0` are accepted;
/// empty strings, negatives, fractions and garbage become `None`.
pub fn parse_count(value: Option<&Value>) -> Option<u32> {
    match value {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(n) => u32::try_from(n).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u32),
        },
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Truthiness of an optional flag: `false`, zero, `""`, empty containers,
/// `null` and a missing key are false, anything else is true.
pub fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Null) | None => false,
    }
}

pub fn parse_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// `deserialize_with` adapter for [`parse_count`].
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_count(value.as_ref()))
}

/// `deserialize_with` adapter for [`parse_date`].
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_date(value.as_ref()))
}

/// `deserialize_with` adapter for [`parse_flag`].
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_flag(value.as_ref()))
}

/// `deserialize_with` adapter for [`parse_text`].
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_text(value.as_ref()))
}
