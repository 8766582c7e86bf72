//! The aggregator: prioritized sources merged into one namespace.

use super::merge::{fill_merge, is_container};
use crate::error::{ConfigError, ConfigResult};
use crate::functions::{ConfigFunction, FunctionRegistry};
use crate::sources::Source;
use crate::template::{Resolution, substitute};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Layered configuration over prioritized sources.
///
/// Lookups walk the sources from highest to lowest priority:
///
/// - the first source holding a scalar at the key wins outright, and lower
///   sources are not consulted
/// - container values (mappings and sequences) are merged, higher priority
///   sources keeping their leaves and lower ones filling gaps
/// - once a container has been seen, a lower-priority scalar at the same key
///   is ignored and the merged container is returned
///
/// Note the asymmetry of the last two rules: a scalar only wins when it
/// comes from the first source defining the key.
///
/// Resolved values then go through template substitution (see
/// [`crate::template`]). Nothing is cached, so variable and source changes
/// are visible to the next lookup.
///
/// # Example
/// ```
/// use layerconf::{Config, MemorySource};
/// use serde_json::json;
///
/// # fn main() -> Result<(), layerconf::ConfigError> {
/// let mut config = Config::new();
/// config.add_source(MemorySource::from_value(json!({"db": {"host": "{= host}", "port": 5432}}), 0)?);
/// config.add_source(MemorySource::from_value(json!({"db": {"port": 6432}}), 10)?);
/// config.set_variable("host", "localhost");
///
/// assert_eq!(config.get("db.port")?, Some(json!(6432)));
/// assert_eq!(config.get("db")?, Some(json!({"host": "localhost", "port": 6432})));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    sources: Vec<Arc<dyn Source>>,
    functions: FunctionRegistry,
    variables: Map<String, Value>,
    root_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Empty configuration with the built-in functions registered.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            functions: FunctionRegistry::with_builtins(),
            variables: Map::new(),
            root_directory: None,
        }
    }

    /// Builder form of [`Config::add_source`].
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.add_source(source);
        self
    }

    /// Builder form of [`Config::add_sources`].
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Arc<dyn Source>>) -> Self {
        self.add_sources(sources);
        self
    }

    /// Builder form of [`Config::set_variables`].
    pub fn with_variables(mut self, variables: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.set_variables(variables);
        self
    }

    /// Add a source, keeping the list ordered by descending priority.
    ///
    /// Sources with equal priority keep their insertion order.
    pub fn add_source(&mut self, source: impl Source + 'static) {
        self.add_sources([Arc::new(source) as Arc<dyn Source>]);
    }

    /// Add several shared sources at once.
    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = Arc<dyn Source>>) {
        let before = self.sources.len();
        self.sources.extend(sources);
        // sort_by_key is stable
        self.sources.sort_by_key(|source| Reverse(source.priority()));
        debug!(
            added = self.sources.len() - before,
            total = self.sources.len(),
            "Registered configuration sources"
        );
    }

    /// Sources in lookup order.
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    /// Register a function, replacing any function with the same name.
    pub fn add_function(&mut self, function: impl ConfigFunction + 'static) {
        self.functions.register(function);
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Insert every variable of `variables`, overwriting existing names.
    pub fn set_variables(&mut self, variables: impl IntoIterator<Item = (String, Value)>) -> &mut Self {
        self.variables.extend(variables);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Override the directory reported by `{const: directory_root}`.
    pub fn set_root_directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.root_directory = Some(directory.into());
        self
    }

    /// Root directory of the configuration.
    ///
    /// The explicit override if set, otherwise the directory of the
    /// highest-priority source loaded from disk.
    pub fn root_directory(&self) -> Option<&Path> {
        self.root_directory
            .as_deref()
            .or_else(|| self.sources.iter().find_map(|source| source.directory()))
    }

    /// Resolved value at the dotted `key`, `None` when no source has it.
    ///
    /// An empty key addresses the whole namespace.
    pub fn get(&self, key: &str) -> ConfigResult<Option<Value>> {
        let mut ctx = Resolution::new(self);
        ctx.resolve_key(key).map_err(|e| attach_key(e, key))
    }

    /// Resolved value at `key`, or `default` when no source has it.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> ConfigResult<Value> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Resolved value at `key`, failing with `NotFound` when no source has it.
    pub fn require(&self, key: &str) -> ConfigResult<Value> {
        self.get(key)?
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    /// Whether any source holds `key`. Never fails.
    pub fn has(&self, key: &str) -> bool {
        self.sources.iter().any(|source| source.has(key))
    }

    /// Fully resolved snapshot of the whole namespace.
    ///
    /// Built key by key over the union of the top-level keys of every
    /// source, each merged with the same rule as [`Config::get`], so a
    /// top-level key holds exactly what a direct lookup returns.
    pub fn all(&self) -> ConfigResult<Value> {
        let roots: Vec<Value> = self
            .sources
            .iter()
            .filter_map(|source| source.get(None))
            .collect();
        let keys: BTreeSet<String> = roots
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|root| root.keys().cloned())
            .collect();

        let mut ctx = Resolution::new(self);
        let mut snapshot = Map::with_capacity(keys.len());
        for key in keys {
            let layers = roots.iter().filter_map(|root| root.get(key.as_str()).cloned());
            let Some(value) = merge_layers(layers) else {
                continue;
            };
            let value = ctx
                .enter(&key, |ctx| substitute(value, ctx))
                .map_err(|e| attach_key(e, &key))?;
            snapshot.insert(key, value);
        }

        Ok(Value::Object(snapshot))
    }

    /// Merge and substitute `key` within an ongoing resolution.
    pub(crate) fn resolve_with(
        &self,
        key: Option<&str>,
        ctx: &mut Resolution<'_>,
    ) -> ConfigResult<Option<Value>> {
        trace!(key = key.unwrap_or(""), depth = ctx.depth(), "Resolving key");

        let Some(value) = self.merged(key) else {
            return Ok(None);
        };
        substitute(value, ctx).map(Some)
    }

    /// Raw merged value across sources, before substitution.
    fn merged(&self, key: Option<&str>) -> Option<Value> {
        merge_layers(self.sources.iter().filter_map(|source| source.get(key)))
    }
}

/// Fold the values found for one key, highest priority first.
fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Option<Value> {
    let mut accumulated: Option<Value> = None;

    for value in layers {
        if !is_container(&value) {
            // A container from a higher source outranks this scalar.
            return Some(accumulated.unwrap_or(value));
        }

        accumulated = Some(match accumulated {
            Some(acc) => fill_merge(acc, value),
            None => value,
        });
    }

    accumulated
}

fn attach_key(err: ConfigError, key: &str) -> ConfigError {
    if err.key.is_none() {
        err.with_key(key)
    } else {
        err
    }
}
