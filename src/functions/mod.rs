//! Pluggable substitution functions.
//!
//! A template token `{name: argument}` dispatches to the function registered
//! under `name`. The registry ships with four built-ins (`const`, `env`,
//! `var`, `config`); callers add their own with [`FunctionRegistry::register`]
//! and may shadow a built-in by reusing its name.

mod builtin;

pub use builtin::{ConfigRefFunction, ConstantFunction, EnvFunction, VarFunction};

use crate::error::{ConfigError, ConfigResult};
use crate::template::Resolution;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A named function callable from template tokens.
pub trait ConfigFunction: Send + Sync {
    /// Name used in tokens, case-sensitive.
    fn name(&self) -> &str;

    /// Evaluate the function for a trimmed argument.
    fn execute(&self, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value>;
}

/// Adapts a closure into a [`ConfigFunction`].
pub struct FnFunction<F> {
    name: String,
    f: F,
}

impl<F> FnFunction<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &mut Resolution<'_>) -> ConfigResult<Value> + Send + Sync,
    {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ConfigFunction for FnFunction<F>
where
    F: Fn(&str, &mut Resolution<'_>) -> ConfigResult<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        (self.f)(argument, ctx)
    }
}

/// Name-keyed set of substitution functions.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ConfigFunction>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `const`, `env`, `var` and `config`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ConfigRefFunction);
        registry.register(ConstantFunction::new());
        registry.register(EnvFunction);
        registry.register(VarFunction);
        registry
    }

    /// Add a function, replacing any previous one with the same name.
    pub fn register(&mut self, function: impl ConfigFunction + 'static) {
        self.register_shared(Arc::new(function));
    }

    /// Add an already shared function.
    pub fn register_shared(&mut self, function: Arc<dyn ConfigFunction>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            trace!(function = %name, "Replaced registered function");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ConfigFunction>> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the function registered under `name`.
    pub fn execute(&self, name: &str, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ConfigError::unknown_function(name))?;
        trace!(function = %name, argument = %argument, "Executing function");
        function.execute(argument, ctx)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["config", "const", "env", "var"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let config = Config::new();
        let mut registry = FunctionRegistry::with_builtins();
        registry.register(FnFunction::new("env", |arg: &str, _: &mut Resolution<'_>| {
            Ok(json!(format!("fake:{}", arg)))
        }));
        assert_eq!(registry.len(), 4);

        let mut ctx = Resolution::new(&config);
        assert_eq!(registry.execute("env", "HOME", &mut ctx).unwrap(), json!("fake:HOME"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let config = Config::new();
        let registry = FunctionRegistry::with_builtins();
        let mut ctx = Resolution::new(&config);

        let err = registry.execute("ENV", "HOME", &mut ctx).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownFunction);
        assert!(err.message.contains("ENV"));
    }
}
