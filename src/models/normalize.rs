//! Payload → canonical record conversion.
//!
//! Aggregators only ever see the typed records produced here. Upstream
//! payloads carry their items under `value` (Graph and Defender REST) or
//! `Results` (advanced hunting); a bare array is accepted as well.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// The item array of a collection payload, if it has one.
pub fn item_array(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("Results"))
            .and_then(Value::as_array),
        _ => None,
    }
}

/// Convert every item of a collection payload into `T`.
///
/// An item whose shape does not match `T` becomes `T::default()` so it still
/// counts toward the collection total.
pub fn collection<T: DeserializeOwned + Default>(payload: &Value) -> Vec<T> {
    let Some(items) = item_array(payload) else {
        return Vec::new();
    };
    items.iter().map(record).collect()
}

/// Convert a single-object payload into `T`; collection payloads yield their first item.
pub fn single<T: DeserializeOwned + Default>(payload: &Value) -> Option<T> {
    match item_array(payload) {
        Some(items) => items.first().map(record),
        None if payload.is_object() => Some(record(payload)),
        None => None,
    }
}

fn record<T: DeserializeOwned + Default>(item: &Value) -> T {
    match T::deserialize(item) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Item did not match record shape, using defaults");
            T::default()
        }
    }
}

/// Deserialize a count that may arrive as an integer, a float or a numeric string.
///
/// Negative or non-numeric values read as `None`.
pub fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_of))
}

fn count_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => count_of(&serde_json::from_str(s.trim()).ok()?),
        _ => None,
    }
}
