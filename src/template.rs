//! Template substitution.
//!
//! A string value is a template token when the whole value is wrapped in
//! `{` and `}`:
//!
//! - `{= name}` reads the user variable `name` (same as `{var: name}`)
//! - `{fn: argument}` calls the registered function `fn` with the trimmed
//!   argument; everything after the first `:` is the argument
//!
//! Strings that merely contain a token somewhere inside are left untouched,
//! as are wrapped strings without a `:` (such as `{not}`). The function result
//! replaces the string outright and may change its type. It is not
//! substituted again, so a variable holding `{"host": "db"}` stays text.
//!
//! Substitution is a pure transform: [`substitute`] consumes a value and
//! returns a new tree. State that must survive across nested lookups (keys
//! in progress, recursion depth) lives in an explicit [`Resolution`] context
//! owned by one top-level call.

use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::functions::VarFunction;
use serde_json::{Map, Value};
use tracing::trace;

/// Maximum nesting of `config` re-entries.
pub const MAX_DEPTH: usize = 32;

pub const OPEN: char = '{';
pub const CLOSE: char = '}';

/// A parsed template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{= name}`
    Variable(&'a str),
    /// `{function: argument}`
    Call { function: &'a str, argument: &'a str },
}

impl<'a> Token<'a> {
    /// Parse a whole string value as a token.
    ///
    /// Returns `Ok(None)` when the value is not a token, and an `Invalid`
    /// error for a token with an empty function name.
    pub fn parse(text: &'a str) -> ConfigResult<Option<Self>> {
        let Some(inner) = text
            .strip_prefix(OPEN)
            .and_then(|rest| rest.strip_suffix(CLOSE))
        else {
            return Ok(None);
        };

        if let Some(name) = inner.strip_prefix('=') {
            return Ok(Some(Token::Variable(name.trim())));
        }

        let Some((function, argument)) = inner.split_once(':') else {
            return Ok(None);
        };

        let function = function.trim();
        if function.is_empty() {
            return Err(ConfigError::invalid(format!(
                "Missing function name in template \"{}\"",
                text
            )));
        }

        Ok(Some(Token::Call {
            function,
            argument: argument.trim(),
        }))
    }

    fn function(&self) -> &'a str {
        match *self {
            Token::Variable(_) => VarFunction::NAME,
            Token::Call { function, .. } => function,
        }
    }

    fn argument(&self) -> &'a str {
        match *self {
            Token::Variable(name) => name,
            Token::Call { argument, .. } => argument,
        }
    }
}

/// Per-call resolution state.
///
/// Created by [`Config`] for every top-level `get`/`all` and handed to each
/// function invocation. Functions that need to look up another key go
/// through [`Resolution::resolve_key`], which guards against cycles and
/// unbounded recursion.
#[derive(Debug)]
pub struct Resolution<'a> {
    config: &'a Config,
    in_progress: Vec<String>,
    depth: usize,
}

impl<'a> Resolution<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            in_progress: Vec::new(),
            depth: 0,
        }
    }

    /// The aggregator this resolution runs against.
    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Keys currently being resolved, outermost first.
    pub fn in_progress(&self) -> &[String] {
        &self.in_progress
    }

    /// Resolve `key` against the aggregator within this resolution.
    ///
    /// Fails with `CyclicReference` if `key` is already being resolved.
    pub fn resolve_key(&mut self, key: &str) -> ConfigResult<Option<Value>> {
        let config = self.config;
        self.enter(key, |ctx| config.resolve_with(Some(key), ctx))
    }

    /// Run `f` with `key` marked in progress, one level deeper.
    pub(crate) fn enter<T>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut Self) -> ConfigResult<T>,
    ) -> ConfigResult<T> {
        if self.in_progress.iter().any(|k| k == key) {
            trace!(key = %key, chain = ?self.in_progress, "Cyclic reference");
            return Err(ConfigError::cyclic_reference(key));
        }

        self.in_progress.push(key.to_string());
        let result = self.descend(f);
        self.in_progress.pop();
        result
    }

    /// Run `f` one level deeper, failing past [`MAX_DEPTH`].
    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> ConfigResult<T>) -> ConfigResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(ConfigError::depth_exceeded(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Substitute every template token in `value`.
pub fn substitute(value: Value, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
    match value {
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key, substitute(value, ctx)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| substitute(item, ctx))
            .collect::<ConfigResult<Vec<_>>>()
            .map(Value::Array),
        Value::String(text) => match Token::parse(&text)? {
            Some(token) => evaluate(token, ctx),
            None => Ok(Value::String(text)),
        },
        other => Ok(other),
    }
}

fn evaluate(token: Token<'_>, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
    // Results are final: a returned string that looks like a token is data.
    let config = ctx.config();
    config
        .functions()
        .execute(token.function(), token.argument(), ctx)
}
