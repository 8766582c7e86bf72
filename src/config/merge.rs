//! Merge policies for configuration trees.
//!
//! Two policies are used across the crate:
//!
//! - [`fill_merge`]: first-source-wins per key. The accumulated value keeps
//!   every leaf it already has; the incoming (lower-priority) value only fills
//!   gaps. Used when merging containers across sources and for
//!   `{extends: a, b}` chains.
//! - [`deep_merge`]: overlay wins per key. Used for `@extends`, where a child
//!   document overrides its parent.

use serde_json::Value;

/// Merge `lower` into `acc`, keeping `acc`'s values wherever both define one.
///
/// - Objects are merged recursively: keys missing from `acc` are copied over
/// - Arrays are merged index-wise: `acc`'s elements stay (merged recursively
///   with the same index when both are containers), extra trailing elements
///   of `lower` are appended
/// - Any other pairing keeps `acc`
///
/// # Example
/// ```
/// use serde_json::json;
/// use layerconf::config::fill_merge;
///
/// let high = json!({"server": {"port": 9000}, "hosts": ["b"]});
/// let low = json!({"server": {"port": 8080, "host": "localhost"}, "hosts": ["a", "c"]});
/// let result = fill_merge(high, low);
/// assert_eq!(
///     result,
///     json!({"server": {"port": 9000, "host": "localhost"}, "hosts": ["b", "c"]})
/// );
/// ```
pub fn fill_merge(acc: Value, lower: Value) -> Value {
    match (acc, lower) {
        (Value::Object(mut acc_map), Value::Object(lower_map)) => {
            for (key, lower_value) in lower_map {
                let merged_value = match acc_map.remove(&key) {
                    Some(acc_value) => fill_merge(acc_value, lower_value),
                    None => lower_value,
                };
                acc_map.insert(key, merged_value);
            }
            Value::Object(acc_map)
        }
        (Value::Array(acc_items), Value::Array(lower_items)) => {
            let mut lower_items = lower_items.into_iter();
            let mut merged: Vec<Value> = acc_items
                .into_iter()
                .map(|acc_item| match lower_items.next() {
                    Some(lower_item) => fill_merge(acc_item, lower_item),
                    None => acc_item,
                })
                .collect();
            merged.extend(lower_items);
            Value::Array(merged)
        }
        (acc, _) => acc,
    }
}

/// Fold [`fill_merge`] over `values`, earlier values taking precedence.
///
/// Returns `None` for an empty input.
pub fn fill_merge_all(values: impl IntoIterator<Item = Value>) -> Option<Value> {
    values.into_iter().fold(None, |acc, value| match acc {
        Some(acc) => Some(fill_merge(acc, value)),
        None => Some(value),
    })
}

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans, nulls are replaced entirely
///
/// # Example
/// ```
/// use serde_json::json;
/// use layerconf::config::deep_merge;
///
/// let parent = json!({"server": {"port": 8080, "host": "localhost"}, "features": ["a", "b"]});
/// let child = json!({"server": {"port": 9000}, "features": ["c"]});
/// let result = deep_merge(parent, child);
/// assert_eq!(
///     result,
///     json!({"server": {"port": 9000, "host": "localhost"}, "features": ["c"]})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Whether a value takes part in container merging.
pub fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
