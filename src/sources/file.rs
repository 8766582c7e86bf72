//! File-backed sources and document parsing.

use super::{IncludeResolver, MemorySource, Source, kind_of};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Failure to parse raw document text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("root must be a mapping, got {0}")]
    NotAMapping(&'static str),
}

/// Document text formats understood by the built-in sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON, tolerating whole-line `//` comments and trailing commas.
    Json,
    Yaml,
}

impl Format {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" | "json5" | "jsonc" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
    }

    /// Parse document text into a root mapping.
    ///
    /// Blank documents parse as an empty mapping.
    pub fn parse(self, text: &str) -> Result<Map<String, Value>, ParseError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = match self {
            Format::Json => serde_json::from_str(&strip_json_extras(text))?,
            Format::Yaml => serde_yaml::from_str(text)?,
        };

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(ParseError::NotAMapping(kind_of(&other))),
        }
    }
}

/// Whole-line `//` comments. JSON strings cannot span lines, so a line
/// starting with `//` is never inside a string.
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*//.*$").expect("line comment pattern is valid"));

/// Remove whole-line `//` comments and trailing commas before `}` or `]`.
fn strip_json_extras(text: &str) -> String {
    strip_trailing_commas(&LINE_COMMENT.replace_all(text, ""))
}

/// Drop commas followed only by whitespace and a closing bracket, leaving
/// string literals untouched.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut pending_comma: Option<usize> = None;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        match c {
            ',' => pending_comma = Some(out.len()),
            '}' | ']' => {
                if let Some(at) = pending_comma.take() {
                    out.remove(at);
                }
            }
            c if c.is_whitespace() => {}
            '"' => {
                in_string = true;
                pending_comma = None;
            }
            _ => pending_comma = None,
        }
        out.push(c);
    }

    out
}

/// Read and parse a document from disk.
///
/// The format comes from `format` or, failing that, from the file extension
/// (JSON when unknown).
pub fn read_document(path: &Path, format: Option<Format>) -> ConfigResult<Map<String, Value>> {
    let display_path = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::file_not_found(&display_path));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(&display_path, e))?;
    let format = format
        .or_else(|| Format::from_path(path))
        .unwrap_or(Format::Json);

    debug!(path = %display_path, ?format, "Parsing configuration document");
    format
        .parse(&content)
        .map_err(|e| ConfigError::invalid_document(&display_path, e))
}

impl MemorySource {
    /// Parse document text into an in-memory source.
    pub fn parse(text: &str, format: Format, priority: i64) -> ConfigResult<Self> {
        let map = format
            .parse(text)
            .map_err(|e| ConfigError::invalid(format!("Not a valid configuration document: {}", e)))?;
        Ok(Self::new(map, priority))
    }
}

/// Source backed by a document on disk.
///
/// The file is read once when the source is opened.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    directory: PathBuf,
    inner: MemorySource,
}

impl FileSource {
    /// Load a document as-is, without resolving inclusion directives.
    pub fn open(path: impl AsRef<Path>, priority: i64) -> ConfigResult<Self> {
        let path = path.as_ref();
        let map = read_document(path, None)?;
        Ok(Self::loaded(path, map, priority))
    }

    /// Load a document, resolving `@extends`, `{include: ..}` and
    /// `{extends: ..}` through `resolver`.
    pub fn open_with(
        path: impl AsRef<Path>,
        priority: i64,
        resolver: &IncludeResolver,
    ) -> ConfigResult<Self> {
        let path = path.as_ref();
        let map = resolver.load(path)?;
        Ok(Self::loaded(path, map, priority))
    }

    fn loaded(path: &Path, map: Map<String, Value>, priority: i64) -> Self {
        let directory = std::fs::canonicalize(path)
            .ok()
            .and_then(|id| id.parent().map(Path::to_path_buf))
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            directory,
            inner: MemorySource::new(map, priority),
        }
    }

    /// Path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole loaded document.
    pub fn data(&self) -> &Value {
        self.inner.data()
    }
}

impl Source for FileSource {
    fn priority(&self) -> i64 {
        self.inner.priority()
    }

    fn get(&self, key: Option<&str>) -> Option<Value> {
        self.inner.get(key)
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(key)
    }

    fn directory(&self) -> Option<&Path> {
        Some(&self.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use tempfile::TempDir;

    const JSON_WITH_EXTRAS: &str = r#"
{
  "qux": "value1",
  "section": {
    "foo": "value",
    "qux": "value2"
  },
  "section2": {
    // Comment
    "bar": "value3"
  },
}
"#;

    #[test]
    fn test_parse_json_with_comments_and_trailing_commas() {
        let source = MemorySource::parse(JSON_WITH_EXTRAS, Format::Json, 0).unwrap();
        assert_eq!(source.get(Some("qux")), Some(json!("value1")));
        assert_eq!(source.get(Some("section.qux")), Some(json!("value2")));
        assert_eq!(source.get(Some("section2")), Some(json!({"bar": "value3"})));
        assert!(!source.has("baz"));
    }

    #[test]
    fn test_closing_brackets_inside_strings_survive() {
        let map = Format::Json
            .parse(r#"{"pattern": "a, }", "list": "x,]", "quoted": "say \",]\"", "n": [1, 2,],}"#)
            .unwrap();
        assert_eq!(map["pattern"], json!("a, }"));
        assert_eq!(map["list"], json!("x,]"));
        assert_eq!(map["quoted"], json!("say \",]\""));
        assert_eq!(map["n"], json!([1, 2]));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let map = Format::Json.parse(r#"{"url": "http://example.com"}"#).unwrap();
        assert_eq!(map["url"], json!("http://example.com"));
    }

    #[test]
    fn test_parse_failures() {
        let err = MemorySource::parse("{", Format::Json, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);

        let err = Format::Json.parse("[1, 2]").unwrap_err();
        assert!(matches!(err, ParseError::NotAMapping("sequence")));

        assert!(matches!(
            Format::Yaml.parse("key: [unclosed"),
            Err(ParseError::Yaml(_))
        ));
    }

    #[test]
    fn test_blank_documents_are_empty() {
        assert!(Format::Json.parse("  \n").unwrap().is_empty());
        assert!(Format::Yaml.parse("~").unwrap().is_empty());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/config.json5")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("config.YML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("config.ini")), None);
        assert_eq!(Format::from_path(Path::new("config")), None);
    }

    #[test]
    fn test_open_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.yaml");
        std::fs::write(&path, "server:\n  port: 8080\n  hosts: [a, b]\n").unwrap();

        let source = FileSource::open(&path, 5).unwrap();
        assert_eq!(source.priority(), 5);
        assert_eq!(source.path(), path.as_path());
        assert_eq!(source.get(Some("server.port")), Some(json!(8080)));
        assert_eq!(source.get(Some("server.hosts.1")), Some(json!("b")));
    }

    #[test]
    fn test_open_missing_and_malformed_files() {
        let temp = TempDir::new().unwrap();

        let err = FileSource::open(temp.path().join("missing.json"), 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{\"a\": ").unwrap();
        let err = FileSource::open(&path, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::Invalid);
        assert_eq!(err.reference, Some(path.display().to_string()));
    }
}
