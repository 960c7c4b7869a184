//! Configuration validation

use crate::Config;
use regex::Regex;
use zipline_core::{Error, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_logging(config)?;
    validate_gzip(config)?;
    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.logging.level.trim();
    if level.is_empty() {
        return Err(Error::Config("logging level cannot be empty".to_string()));
    }

    // Full filter directives (`zipline=debug,hyper=warn`) are passed through untouched.
    if !level.contains('=') && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level: {} (must be one of {})",
            level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

fn validate_gzip(config: &Config) -> Result<()> {
    let gzip = &config.gzip;

    if gzip.max_idle == 0 {
        return Err(Error::Config("gzip max_idle must be > 0".to_string()));
    }

    for ext in &gzip.excluded_extensions {
        if !ext.starts_with('.') {
            return Err(Error::Config(format!(
                "gzip excluded extension '{}' must start with a dot",
                ext
            )));
        }
    }

    for pattern in &gzip.excluded_path_regexes {
        Regex::new(pattern).map_err(|e| {
            Error::Config(format!("invalid gzip excluded path regex '{}': {}", pattern, e))
        })?;
    }

    for path in &gzip.excluded_paths {
        if !path.starts_with('/') {
            tracing::warn!(
                path = %path,
                "Excluded path does not start with '/', it will never match"
            );
        }
    }

    if !gzip.enabled && gzip.decompress_requests {
        tracing::warn!("gzip decompress_requests has no effect while gzip is disabled");
    }

    Ok(())
}
