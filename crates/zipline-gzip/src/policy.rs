//! Per-request decision whether a response may be compressed

use crate::exclusion::{self, ExcludedExtensions, ExcludedPathRegexes, ExcludedPaths};
use http::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION};
use http::{HeaderMap, Request};

/// Immutable compression settings shared by every request
#[derive(Debug, Clone, Default)]
pub struct CompressionPolicy {
    pub(crate) min_length: usize,
    pub(crate) excluded_extensions: ExcludedExtensions,
    pub(crate) excluded_paths: ExcludedPaths,
    pub(crate) excluded_path_regexes: ExcludedPathRegexes,
}

impl CompressionPolicy {
    /// Bytes a response must reach before it is compressed
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Whether the response to `request` is eligible for compression
    pub fn should_compress<B>(&self, request: &Request<B>) -> bool {
        let headers = request.headers();
        if !accepts_gzip(headers) || wants_upgrade(headers) || wants_event_stream(headers) {
            return false;
        }

        !self.is_excluded(request.uri().path())
    }

    /// Whether `path` is excluded by extension, prefix or pattern, checked in that order
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_extensions
            .contains(exclusion::extension(path))
            || self.excluded_paths.contains(path)
            || self.excluded_path_regexes.contains(path)
    }
}

/// Whether `Accept-Encoding` admits a gzip response
///
/// `gzip`, `x-gzip` and `*` count unless weighted `q=0`; an explicit gzip entry wins
/// over the wildcard.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    let mut gzip = None;
    let mut wildcard = None;

    let codings = headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','));

    for entry in codings {
        let mut parts = entry.split(';');
        let coding = parts.next().unwrap_or("").trim();
        let accepted = parts.all(|param| quality(param) != Some(0.0));

        if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
            gzip = Some(gzip.unwrap_or(false) || accepted);
        } else if coding == "*" {
            wildcard = Some(accepted);
        }
    }

    gzip.or(wildcard).unwrap_or(false)
}

fn quality(param: &str) -> Option<f32> {
    let (name, value) = param.split_once('=')?;
    if !name.trim().eq_ignore_ascii_case("q") {
        return None;
    }
    value.trim().parse().ok()
}

fn wants_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/event-stream"))
}
