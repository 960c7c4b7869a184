//! Configuration file formats

use crate::Config;
use std::fmt;
use std::path::Path;
use zipline_core::{Error, Result};

/// Syntax of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML (`.yaml`, `.yml`)
    Yaml,
    /// TOML (`.toml`)
    Toml,
    /// JSON (`.json`)
    Json,
}

const ALL: [ConfigFormat; 3] = [ConfigFormat::Yaml, ConfigFormat::Toml, ConfigFormat::Json];

impl ConfigFormat {
    /// File extensions mapped to this format, without the dot
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Yaml => &["yaml", "yml"],
            ConfigFormat::Toml => &["toml"],
            ConfigFormat::Json => &["json"],
        }
    }

    /// Pick the format from `path`'s extension, ignoring case
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

        ALL.into_iter()
            .find(|format| {
                format
                    .extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .ok_or_else(|| {
                Error::Config(format!(
                    "cannot tell the format of {}: expected a .yaml, .yml, .toml or .json file",
                    path.display()
                ))
            })
    }

    pub(crate) fn parse(self, content: &str) -> Result<Config> {
        let parsed: std::result::Result<Config, String> = match self {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| Error::Config(format!("invalid {self} configuration: {e}")))
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        })
    }
}
