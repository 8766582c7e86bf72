//! Recursive document inclusion and extension.
//!
//! Documents may pull in other documents in three ways:
//!
//! - a string leaf `{include: other.json}` is replaced by the loaded document
//! - a string leaf `{extends: a.json, b.yaml}` is replaced by the documents
//!   folded left to right, later ones only filling gaps
//! - a root key `@extends` names parent documents; the child is deep-merged
//!   over them and the key itself is dropped
//!
//! References are resolved relative to the directory of the document that
//! contains them. A [`LoadStack`] of canonical paths guards against cycles
//! across the whole inclusion graph.

use super::Format;
use super::file::read_document;
use crate::config::merge::{deep_merge, fill_merge_all};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Root key naming the parent document(s) of a document.
pub const EXTENDS_KEY: &str = "@extends";

/// Canonical paths of the documents currently being loaded.
///
/// Scoped to a single top-level load. Entries are pushed through
/// [`LoadStack::enter`] and popped when the returned guard drops, on success
/// and error paths alike.
#[derive(Debug, Default)]
pub struct LoadStack {
    entries: Vec<PathBuf>,
}

impl LoadStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in progress, failing if it already is.
    pub fn enter(&mut self, id: PathBuf) -> ConfigResult<LoadGuard<'_>> {
        if self.contains(&id) {
            debug!(path = %id.display(), depth = self.entries.len(), "Inclusion cycle detected");
            return Err(ConfigError::recursive_inclusion(&id.display().to_string()));
        }
        trace!(path = %id.display(), "Push load stack");
        self.entries.push(id);
        Ok(LoadGuard { stack: self })
    }

    pub fn contains(&self, id: &Path) -> bool {
        self.entries.iter().any(|entry| entry == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths in load order, outermost first.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}

/// Releases the innermost [`LoadStack`] entry on drop.
#[derive(Debug)]
pub struct LoadGuard<'a> {
    stack: &'a mut LoadStack,
}

impl Deref for LoadGuard<'_> {
    type Target = LoadStack;

    fn deref(&self) -> &LoadStack {
        self.stack
    }
}

impl DerefMut for LoadGuard<'_> {
    fn deref_mut(&mut self) -> &mut LoadStack {
        self.stack
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.stack.entries.pop() {
            trace!(path = %id.display(), "Pop load stack");
        }
    }
}

enum Directive<'a> {
    Include(&'a str),
    Extends(Vec<&'a str>),
}

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\{\s*(include|extends)\s*:\s*([^{}]+?)\s*\}\s*$")
        .expect("directive pattern is valid")
});

fn parse_directive(text: &str) -> Option<Directive<'_>> {
    let caps = DIRECTIVE.captures(text)?;
    let action = caps.get(1)?.as_str();
    let target = caps.get(2)?.as_str();

    if action.eq_ignore_ascii_case("include") {
        Some(Directive::Include(target))
    } else {
        Some(Directive::Extends(split_refs(target)))
    }
}

fn split_refs(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

/// Loads documents with inclusion directives resolved.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    format: Option<Format>,
}

impl IncludeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a format for every document instead of guessing from extensions.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Load the document at `path` and everything it references.
    pub fn load(&self, path: &Path) -> ConfigResult<Map<String, Value>> {
        let mut stack = LoadStack::new();
        self.load_with(path, &mut stack)
    }

    /// Load `path` as part of an ongoing load tracked by `stack`.
    pub fn load_with(&self, path: &Path, stack: &mut LoadStack) -> ConfigResult<Map<String, Value>> {
        let id = canonicalize(path)?;
        let dir = id.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut guard = stack.enter(id.clone())?;

        debug!(path = %id.display(), depth = guard.len(), "Loading configuration document");
        let mut document = read_document(&id, self.format)?;
        let parents = document.remove(EXTENDS_KEY);

        let mut resolved = Map::with_capacity(document.len());
        for (key, value) in document {
            let value = self.resolve_value(value, &dir, &key, &mut guard)?;
            resolved.insert(key, value);
        }

        let Some(parents) = parents else {
            return Ok(resolved);
        };

        let refs = extends_refs(&parents)
            .map_err(|e| e.with_key(EXTENDS_KEY).with_reference(id.display().to_string()))?;
        let mut loaded = Vec::with_capacity(refs.len());
        for reference in refs {
            let parent = self
                .load_relative(&reference, &dir, &mut guard)
                .map_err(|e| wrap(e, &format!("{{{}: {}}}", EXTENDS_KEY, reference), EXTENDS_KEY, &reference))?;
            loaded.push(Value::Object(parent));
        }

        let parent = fill_merge_all(loaded).unwrap_or_else(|| Value::Object(Map::new()));
        match deep_merge(parent, Value::Object(resolved)) {
            Value::Object(map) => Ok(map),
            // deep_merge of two mappings is always a mapping
            _ => Ok(Map::new()),
        }
    }

    fn load_relative(&self, reference: &str, dir: &Path, stack: &mut LoadStack) -> ConfigResult<Map<String, Value>> {
        self.load_with(&dir.join(reference), stack)
    }

    fn resolve_value(&self, value: Value, dir: &Path, key: &str, stack: &mut LoadStack) -> ConfigResult<Value> {
        match value {
            Value::Object(map) => {
                let mut resolved = Map::with_capacity(map.len());
                for (child, value) in map {
                    let value = self.resolve_value(value, dir, &join_key(key, &child), stack)?;
                    resolved.insert(child, value);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(item, dir, &join_key(key, &i.to_string()), stack))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Array),
            Value::String(text) => match parse_directive(&text) {
                Some(Directive::Include(reference)) => self
                    .load_relative(reference, dir, stack)
                    .map(Value::Object)
                    .map_err(|e| wrap(e, &text, key, reference)),
                Some(Directive::Extends(refs)) => {
                    let mut loaded = Vec::with_capacity(refs.len());
                    for reference in refs {
                        let document = self
                            .load_relative(reference, dir, stack)
                            .map_err(|e| wrap(e, &text, key, reference))?;
                        loaded.push(Value::Object(document));
                    }
                    Ok(fill_merge_all(loaded).unwrap_or_else(|| Value::Object(Map::new())))
                }
                None => Ok(Value::String(text)),
            },
            other => Ok(other),
        }
    }
}

fn extends_refs(value: &Value) -> ConfigResult<Vec<String>> {
    match value {
        Value::String(list) => Ok(split_refs(list).into_iter().map(String::from).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(reference) => Ok(reference.trim().to_string()),
                _ => Err(ConfigError::invalid("@extends entries must be strings")),
            })
            .collect(),
        _ => Err(ConfigError::invalid(
            "@extends must be a string or a list of strings",
        )),
    }
}

fn canonicalize(path: &Path) -> ConfigResult<PathBuf> {
    let display = path.display().to_string();
    match std::fs::canonicalize(path) {
        Ok(id) => Ok(id),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::file_not_found(&display)),
        Err(e) => Err(ConfigError::io(&display, e)),
    }
}

fn wrap(err: ConfigError, line: &str, key: &str, reference: &str) -> ConfigError {
    let err = if err.reference.is_none() {
        err.with_reference(reference)
    } else {
        err
    };
    let path = match err.key.as_deref() {
        // Parents of `@extends` merge at the root, included documents under `key`.
        Some(inner) if key == EXTENDS_KEY => inner.to_string(),
        Some(inner) => join_key(key, inner),
        None => key.to_string(),
    };
    err.context(format!("Unable to resolve \"{}\" at key \"{}\"", line, key))
        .with_key(path)
}
