//! Output formatting for resolved values.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

/// Output format for resolved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Render a value for display.
    ///
    /// Plain strings are printed as-is so shell callers can use them
    /// directly; everything else is serialized.
    pub fn render(&self, value: &Value) -> Result<String> {
        if let Value::String(s) = value {
            return Ok(s.clone());
        }

        let rendered = match self {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
        };
        Ok(rendered.trim_end().to_string())
    }
}
