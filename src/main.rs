//! layerconf command line tool
//!
//! Loads configuration documents in priority order and resolves keys
//! against them.

use anyhow::Result;
use clap::Parser;
use layerconf::cli::{Cli, Command, GetArgs, parse_value};
use layerconf::config::Config;
use layerconf::format::OutputFormat;
use layerconf::logging;
use serde_json::Value;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log, cli.verbose)?;

    let config = cli.build_config()?;
    debug!(
        sources = config.sources().len(),
        variables = config.variables().len(),
        "Configuration assembled"
    );

    match &cli.command {
        Command::Get(args) => run_get(&config, args, cli.format),
        Command::Has { key } => {
            let found = config.has(key);
            println!("{}", found);
            if !found {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Dump => {
            let all = config.all()?;
            println!("{}", cli.format.render(&all)?);
            Ok(())
        }
    }
}

fn run_get(config: &Config, args: &GetArgs, format: OutputFormat) -> Result<()> {
    let value = if args.required {
        config.require(&args.key)?
    } else if let Some(default) = &args.default {
        config.get_or(&args.key, parse_value(default))?
    } else {
        config.get(&args.key)?.unwrap_or(Value::Null)
    };

    println!("{}", format.render(&value)?);
    Ok(())
}
