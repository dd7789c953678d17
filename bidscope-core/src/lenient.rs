//! Lenient field decoding for upstream API payloads.
//!
//! The platform API is inconsistent about numeric types (amounts arrive as
//! numbers or strings, timestamps as integers or floats) and occasionally
//! sends `null` or an unexpected shape for nested objects. The helpers here
//! are used as `deserialize_with` targets so that a bad field degrades to a
//! default instead of failing the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a monetary amount, treating anything unparseable as `0.0`.
///
/// Accepts JSON numbers and numeric strings. `NaN` and infinities are
/// rejected so that sums stay finite.
pub fn parse_amount(value: &Value) -> f64 {
    parse_f64(value).unwrap_or(0.0)
}

/// Parses an optional float from a number or numeric string.
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parses an epoch-seconds timestamp from an integer, float, or string.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Parses an identifier from an integer or numeric string.
pub fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `deserialize_with` target: amount that defaults to `0.0`.
pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0.0, parse_amount))
}

/// `deserialize_with` target: optional float.
pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_f64))
}

/// `deserialize_with` target: optional epoch-seconds timestamp.
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

/// `deserialize_with` target: optional identifier.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_id))
}

/// `deserialize_with` target: optional non-negative count.
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    opt_id(deserializer)
}

/// `deserialize_with` target: any nested object, falling back to its
/// default when the upstream sends `null` or a different shape.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| T::deserialize(v).ok())
        .unwrap_or_default())
}

/// `deserialize_with` target: optional nested object that becomes `None`
/// on shape mismatch.
pub fn or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

/// Normalizes a collection that may arrive as an array or as an object
/// keyed by id into one ordered sequence.
///
/// Object-shaped collections are ordered by their numeric keys, with
/// non-numeric keys after them in lexical order. Any other shape yields an
/// empty sequence.
pub fn normalize_collection(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| {
                match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                }
            });
            entries.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    }
}
