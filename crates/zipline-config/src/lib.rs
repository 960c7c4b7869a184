//! # Zipline Configuration
//!
//! File-based settings for the `zipline` server: listener, logging and the gzip
//! middleware. Documents may be YAML, TOML or JSON, may reference environment variables
//! as `${VAR}` or `${VAR:-default}`, and are validated before use.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod format;
pub mod loader;
pub mod types;
pub mod validator;

pub use format::ConfigFormat;
pub use loader::{load_from_file, load_from_str};
pub use types::{Config, LogFormat, LoggingConfig, ServerConfig};
pub use validator::validate_config;
pub use zipline_gzip::GzipConfig;

use std::path::Path;
use zipline_core::Result;

/// Read, expand and validate the configuration file at `path`
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    load_from_file(path).and_then(validated)
}

/// Expand and validate an in-memory document
pub fn load_str(content: &str, format: ConfigFormat) -> Result<Config> {
    load_from_str(content, format).and_then(validated)
}

fn validated(config: Config) -> Result<Config> {
    validate_config(&config)?;
    Ok(config)
}
