//! Configuration sources.
//!
//! A source wraps one configuration origin and exposes raw, unsubstituted
//! values by dotted key together with a priority. Templates found in source
//! data are left for the aggregator to evaluate.
//!
//! - [`MemorySource`] - an in-memory mapping
//! - [`FileSource`] - a parsed JSON or YAML document, optionally with
//!   `{include: ..}` / `{extends: ..}` directives resolved by an
//!   [`IncludeResolver`]

mod file;
mod include;

pub use file::{FileSource, Format, ParseError};
pub use include::{EXTENDS_KEY, IncludeResolver, LoadGuard, LoadStack};

use crate::config::traverse::traverse;
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// One prioritized origin of configuration data.
pub trait Source: fmt::Debug + Send + Sync {
    /// Higher priorities are consulted first.
    fn priority(&self) -> i64;

    /// Raw value at `key`, `None` or empty meaning the whole document.
    fn get(&self, key: Option<&str>) -> Option<Value>;

    /// Whether `key` exists in this source.
    fn has(&self, key: &str) -> bool;

    /// Directory the source was loaded from, if it has one.
    fn directory(&self) -> Option<&Path> {
        None
    }
}

/// Source backed by an in-memory mapping.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Value,
    priority: i64,
}

impl MemorySource {
    /// Create a source from a mapping.
    pub fn new(data: Map<String, Value>, priority: i64) -> Self {
        Self {
            data: Value::Object(data),
            priority,
        }
    }

    /// Create a source from any value, which must be a mapping at the root.
    pub fn from_value(data: Value, priority: i64) -> ConfigResult<Self> {
        match data {
            Value::Object(map) => Ok(Self::new(map, priority)),
            other => Err(ConfigError::invalid(format!(
                "Configuration root must be a mapping, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// The whole document.
    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl Source for MemorySource {
    fn priority(&self) -> i64 {
        self.priority
    }

    fn get(&self, key: Option<&str>) -> Option<Value> {
        traverse(&self.data, key).value.cloned()
    }

    fn has(&self, key: &str) -> bool {
        traverse(&self.data, Some(key)).found
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn source() -> MemorySource {
        MemorySource::from_value(
            json!({
                "qux": "value1",
                "section": {"foo": "value", "qux": "value2"},
                "section2": {"bar": "value3"}
            }),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_get_and_has() {
        let source = source();
        assert_eq!(source.get(Some("qux")), Some(json!("value1")));
        assert_eq!(source.get(Some("section.foo")), Some(json!("value")));
        assert_eq!(source.get(Some("section.qux")), Some(json!("value2")));
        assert_eq!(source.get(Some("section2")), Some(json!({"bar": "value3"})));
        assert_eq!(source.get(Some("baz")), None);

        assert!(!source.has("baz"));
        assert!(source.has("section.foo"));
    }

    #[test]
    fn test_whole_document() {
        let source = source();
        assert_eq!(source.get(None).as_ref(), Some(source.data()));
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = MemorySource::from_value(json!(["a"]), 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
        assert!(err.message.contains("sequence"));
    }

    #[test]
    fn test_templates_are_not_substituted() {
        let source = MemorySource::from_value(json!({"name": "{= user}"}), 3).unwrap();
        assert_eq!(source.priority(), 3);
        assert_eq!(source.get(Some("name")), Some(json!("{= user}")));
    }
}
