//! Built-in substitution functions.

use super::ConfigFunction;
use crate::error::{ConfigError, ConfigResult};
use crate::template::Resolution;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const DIRECTORY_ROOT: &str = "directory_root";

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// `{const: name}` - runtime and platform constants.
///
/// Built-in names: `os`, `os_family`, `arch`, `exe_suffix`, `dll_extension`,
/// `path_separator`, `pkg_version`, `home_dir`, `config_dir`, `current_dir`,
/// and `directory_root` (see [`crate::Config::root_directory`], falling
/// back to the current directory).
/// Extra constants can be added with [`ConstantFunction::with_constant`]; they
/// take precedence over the built-in names.
#[derive(Debug, Clone, Default)]
pub struct ConstantFunction {
    constants: HashMap<String, Value>,
}

impl ConstantFunction {
    pub const NAME: &'static str = "const";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    /// Look up a constant without going through a template.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.constants.get(name) {
            return Some(value.clone());
        }

        match name {
            "os" => Some(Value::from(std::env::consts::OS)),
            "os_family" => Some(Value::from(std::env::consts::FAMILY)),
            "arch" => Some(Value::from(std::env::consts::ARCH)),
            "exe_suffix" => Some(Value::from(std::env::consts::EXE_SUFFIX)),
            "dll_extension" => Some(Value::from(std::env::consts::DLL_EXTENSION)),
            "path_separator" => Some(Value::from(std::path::MAIN_SEPARATOR.to_string())),
            "pkg_version" => Some(Value::from(env!("CARGO_PKG_VERSION"))),
            "home_dir" => dirs::home_dir().as_deref().map(path_value),
            "config_dir" => dirs::config_dir().as_deref().map(path_value),
            "current_dir" => std::env::current_dir().ok().as_deref().map(path_value),
            _ => None,
        }
    }
}

impl ConfigFunction for ConstantFunction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        if argument == DIRECTORY_ROOT && !self.constants.contains_key(DIRECTORY_ROOT) {
            let root = ctx.config().root_directory().map(Path::to_path_buf);
            if let Some(root) = root.or_else(|| std::env::current_dir().ok()) {
                return Ok(path_value(&root));
            }
        }

        self.lookup(argument)
            .ok_or_else(|| ConfigError::constant_not_found(argument))
    }
}

/// `{env: NAME}` - process environment, `null` when unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvFunction;

impl EnvFunction {
    pub const NAME: &'static str = "env";
}

impl ConfigFunction for EnvFunction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, argument: &str, _ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        Ok(std::env::var(argument).map(Value::String).unwrap_or(Value::Null))
    }
}

/// `{var: name}` / `{= name}` - user variables, `null` when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarFunction;

impl VarFunction {
    pub const NAME: &'static str = "var";
}

impl ConfigFunction for VarFunction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        Ok(ctx
            .config()
            .variable(argument)
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// `{config: dotted.key}` - the fully resolved value of another key,
/// `null` when the key is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigRefFunction;

impl ConfigRefFunction {
    pub const NAME: &'static str = "config";
}

impl ConfigFunction for ConfigRefFunction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, argument: &str, ctx: &mut Resolution<'_>) -> ConfigResult<Value> {
        Ok(ctx.resolve_key(argument)?.unwrap_or(Value::Null))
    }
}
