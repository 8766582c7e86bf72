//! CLI command definitions for layerconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::Config;
use crate::format::OutputFormat;
use crate::sources::{FileSource, IncludeResolver};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;

/// Resolve keys across layered configuration documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration document, optionally suffixed with @PRIORITY (repeatable)
    ///
    /// Without an explicit priority, later documents take precedence over
    /// earlier ones.
    #[arg(short, long = "source", value_name = "PATH[@PRIORITY]", global = true)]
    pub sources: Vec<SourceSpec>,

    /// User variable; VALUE is parsed as JSON when possible (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable, global = true)]
    pub vars: Vec<(String, Value)>,

    /// Load documents as-is, without resolving include/extends directives
    #[arg(long, global = true)]
    pub no_includes: bool,

    /// Output format for non-string values
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved value of a dotted key
    Get(GetArgs),

    /// Exit successfully if any document defines the key
    Has {
        /// Dotted key, e.g. database.host
        key: String,
    },

    /// Print the fully merged and resolved configuration
    Dump,
}

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dotted key, e.g. database.host
    pub key: String,

    /// Value printed when the key is missing (parsed as JSON when possible)
    #[arg(short, long, value_name = "VALUE", conflicts_with = "required")]
    pub default: Option<String>,

    /// Fail when the key is missing instead of printing null
    #[arg(short, long)]
    pub required: bool,
}

/// A `--source` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub priority: Option<i64>,
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("source path must not be empty".to_string());
        }

        // Only treat the suffix as a priority when it parses, so paths that
        // contain '@' still work.
        if let Some((path, priority)) = s.rsplit_once('@')
            && let Ok(priority) = priority.parse::<i64>()
            && !path.is_empty()
        {
            return Ok(Self {
                path: PathBuf::from(path),
                priority: Some(priority),
            });
        }

        Ok(Self {
            path: PathBuf::from(s),
            priority: None,
        })
    }
}

/// Parse `NAME=VALUE` into a variable.
pub fn parse_variable(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("variable name missing in '{}'", s));
    }
    Ok((name.to_string(), parse_value(value)))
}

/// JSON when the text parses as JSON, a plain string otherwise.
pub fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

impl Cli {
    /// Build the configuration described by the global arguments.
    pub fn build_config(&self) -> Result<Config> {
        let resolver = IncludeResolver::new();
        let mut config = Config::new();

        for (position, spec) in self.sources.iter().enumerate() {
            let priority = spec.priority.unwrap_or(position as i64);
            let source = if self.no_includes {
                FileSource::open(&spec.path, priority)
            } else {
                FileSource::open_with(&spec.path, priority, &resolver)
            }
            .with_context(|| format!("Failed to load configuration source {}", spec.path.display()))?;
            config.add_source(source);
        }

        config.set_variables(self.vars.iter().cloned());
        Ok(config)
    }
}
