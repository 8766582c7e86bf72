//! Layered configuration resolution library.
//!
//! Aggregates prioritized configuration sources into one namespace, resolves
//! dotted keys against it and evaluates template tokens in the results.
//! Documents on disk may include or extend other documents.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod functions;
pub mod logging;
pub mod sources;
pub mod template;

pub use config::{Config, SharedConfig};
pub use error::{ConfigError, ConfigResult, ErrorCode};
pub use functions::{ConfigFunction, FnFunction, FunctionRegistry};
pub use sources::{FileSource, Format, IncludeResolver, MemorySource, Source};
pub use template::Resolution;
