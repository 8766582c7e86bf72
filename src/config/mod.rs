//! Layered configuration resolution.
//!
//! Consolidates configuration from any number of prioritized sources:
//! 1. **Sources** - in-memory mappings or parsed documents, each with a priority
//! 2. **Lookup** - dotted keys (`section.sub.key`) walked through every source
//! 3. **Substitution** - `{fn: arg}` / `{= var}` tokens evaluated on the way out
//!
//! ## Merge Strategy
//! - Scalars: first-found-wins from the highest priority source
//! - Mappings and sequences: merged, higher priority leaves kept, lower ones
//!   filling gaps (sequences index by index)
//!
//! ## Built-in Functions
//! - `{const: name}` - runtime constants (`os`, `arch`, `home_dir`, ...)
//! - `{env: NAME}` - environment variables
//! - `{var: name}` or `{= name}` - user variables
//! - `{config: dotted.key}` - another key's resolved value

pub mod merge;
mod resolver;
mod shared;
pub mod traverse;

pub use merge::{deep_merge, fill_merge, fill_merge_all};
pub use resolver::Config;
pub use shared::SharedConfig;
pub use traverse::{Traversal, lookup, traverse};
