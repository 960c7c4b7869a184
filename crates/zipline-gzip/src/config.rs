//! Configuration for the gzip middleware

use crate::exclusion::DEFAULT_EXCLUDED_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zipline_core::{Error, Result};

/// Gzip compression level, 0 (stored) to 9 (smallest output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LevelValue", into = "u32")]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// Store without compressing
    pub const NONE: Self = Self(0);
    /// Fastest compression
    pub const BEST_SPEED: Self = Self(1);
    /// Balance between speed and size
    pub const DEFAULT: Self = Self(6);
    /// Smallest output
    pub const BEST_COMPRESSION: Self = Self(9);

    /// Create a level, rejecting values above 9
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::Config(format!(
                "compression level must be between 0 and 9, got {}",
                level
            )));
        }
        Ok(Self(level))
    }

    /// Numeric level
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::NONE),
            "best_speed" => Ok(Self::BEST_SPEED),
            "default" => Ok(Self::DEFAULT),
            "best_compression" => Ok(Self::BEST_COMPRESSION),
            other => other
                .parse::<u32>()
                .map_err(|_| Error::Config(format!("unknown compression level: {}", s)))
                .and_then(Self::new),
        }
    }
}

impl From<CompressionLevel> for u32 {
    fn from(level: CompressionLevel) -> Self {
        level.0
    }
}

impl From<CompressionLevel> for flate2::Compression {
    fn from(level: CompressionLevel) -> Self {
        flate2::Compression::new(level.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelValue {
    Number(u32),
    Name(String),
}

impl TryFrom<LevelValue> for CompressionLevel {
    type Error = Error;

    fn try_from(value: LevelValue) -> Result<Self> {
        match value {
            LevelValue::Number(n) => Self::new(n),
            LevelValue::Name(name) => name.parse(),
        }
    }
}

/// Gzip middleware configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GzipConfig {
    /// Enable the middleware
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Compression level (0-9 or a named level)
    #[serde(default)]
    pub level: CompressionLevel,

    /// Bytes a response must reach before it is compressed
    #[serde(default)]
    pub min_length: usize,

    /// Extensions (with leading dot) never compressed
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,

    /// Path prefixes never compressed
    #[serde(default)]
    pub excluded_paths: Vec<String>,

    /// Path patterns never compressed
    #[serde(default)]
    pub excluded_path_regexes: Vec<String>,

    /// Decode gzip request bodies before the handler sees them
    #[serde(default)]
    pub decompress_requests: bool,

    /// Compressors kept idle between requests
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
}

impl Default for GzipConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            level: CompressionLevel::default(),
            min_length: 0,
            excluded_extensions: default_excluded_extensions(),
            excluded_paths: Vec::new(),
            excluded_path_regexes: Vec::new(),
            decompress_requests: false,
            max_idle: default_max_idle(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_excluded_extensions() -> Vec<String> {
    DEFAULT_EXCLUDED_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

/// Default number of idle compressors kept per middleware
pub const DEFAULT_MAX_IDLE: usize = 64;

fn default_max_idle() -> usize {
    DEFAULT_MAX_IDLE
}
