//! Exclusion rules keeping responses uncompressed

use regex::Regex;
use std::collections::HashSet;

/// Extensions compressed responses are never produced for by default
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[".png", ".gif", ".jpeg", ".jpg"];

/// Set of file extensions (with leading dot) to leave uncompressed
///
/// The default set holds [`DEFAULT_EXCLUDED_EXTENSIONS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedExtensions(HashSet<String>);

impl ExcludedExtensions {
    /// Build the set from `extensions`
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(extensions.into_iter().map(Into::into).collect())
    }

    /// Whether `extension` is excluded; exact, case-sensitive
    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(extension)
    }

    /// Number of excluded extensions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ExcludedExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_EXTENSIONS.iter().copied())
    }
}

/// Path prefixes to leave uncompressed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedPaths(Vec<String>);

impl ExcludedPaths {
    /// Build the list from `prefixes`, keeping their order
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(prefixes.into_iter().map(Into::into).collect())
    }

    /// Whether `path` starts with any excluded prefix
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Regular expressions matching paths to leave uncompressed
///
/// Patterns are unanchored: a match anywhere in the path excludes it.
#[derive(Debug, Clone, Default)]
pub struct ExcludedPathRegexes(Vec<Regex>);

impl ExcludedPathRegexes {
    /// Compile `patterns`, failing on the first invalid one
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Whether any pattern matches `path`
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|re| re.is_match(path))
    }

    /// Whether no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Extension of the last path segment, including the dot
///
/// Returns `""` when the last segment has no dot.
pub fn extension(path: &str) -> &str {
    for (i, b) in path.bytes().enumerate().rev() {
        match b {
            b'/' => break,
            b'.' => return &path[i..],
            _ => {}
        }
    }
    ""
}
