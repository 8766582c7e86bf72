//! Dotted-key traversal into nested configuration values.
//!
//! A key such as `database.replicas.0.host` is split on `.` and walked one
//! segment at a time. Objects are indexed by segment name, arrays by a
//! segment that parses as an index. A missing key is a normal outcome,
//! reported through [`Traversal::found`], never an error.

use serde_json::Value;

/// Outcome of walking a dotted key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traversal<'a> {
    /// The value at the key, if found.
    pub value: Option<&'a Value>,
    /// Whether every segment of the key was present.
    pub found: bool,
}

impl<'a> Traversal<'a> {
    fn hit(value: &'a Value) -> Self {
        Self {
            value: Some(value),
            found: true,
        }
    }

    fn miss() -> Self {
        Self {
            value: None,
            found: false,
        }
    }
}

/// Walk `root` along the dotted `key`.
///
/// `None` or an empty key addresses the whole root.
pub fn traverse<'a>(root: &'a Value, key: Option<&str>) -> Traversal<'a> {
    let key = match key {
        Some(key) if !key.is_empty() => key,
        _ => return Traversal::hit(root),
    };

    let mut current = root;
    for segment in key.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Traversal::miss(),
        }
    }

    Traversal::hit(current)
}

/// Shorthand for [`traverse`] returning only the value.
pub fn lookup<'a>(root: &'a Value, key: Option<&str>) -> Option<&'a Value> {
    traverse(root, key).value
}
