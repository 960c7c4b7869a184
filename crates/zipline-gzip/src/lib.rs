//! # Zipline Gzip
//!
//! Gzip middleware for zipline with:
//! - Deferred compression: responses below a minimum length go out verbatim
//! - Accept-Encoding negotiation
//! - Exclusion by extension, path prefix and path pattern
//! - Pooled, resettable compressors
//! - Optional decoding of gzip request bodies
//!
//! ```ignore
//! use zipline_gzip::{CompressionLevel, Gzip, GzipDecompressor};
//!
//! let gzip = Gzip::builder()
//!     .level(CompressionLevel::BEST_SPEED)
//!     .min_length(256)
//!     .excluded_paths(["/metrics"])
//!     .decompressor(GzipDecompressor)
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod compressor;
pub mod config;
pub mod decompress;
pub mod exclusion;
pub mod middleware;
pub mod policy;
pub mod pool;
pub mod writer;

pub use compressor::Compressor;
pub use config::{CompressionLevel, GzipConfig};
pub use decompress::{Decompressor, GzipDecompressor};
pub use exclusion::{ExcludedExtensions, ExcludedPathRegexes, ExcludedPaths};
pub use middleware::{Gzip, GzipBuilder};
pub use policy::CompressionPolicy;
pub use pool::{CompressorPool, PooledCompressor};
pub use writer::{GzipWriter, Phase};
