//! Gzip middleware

use crate::config::{CompressionLevel, GzipConfig, DEFAULT_MAX_IDLE};
use crate::decompress::{Decompressor, GzipDecompressor};
use crate::exclusion::{ExcludedExtensions, ExcludedPathRegexes, ExcludedPaths};
use crate::policy::CompressionPolicy;
use crate::pool::CompressorPool;
use crate::writer::GzipWriter;
use async_trait::async_trait;
use http::header::CONTENT_ENCODING;
use std::sync::Arc;
use zipline_core::{Context, Error, Middleware, Next, Result};

/// Gzip response compression middleware
///
/// Responses reaching the configured minimum length are gzip-encoded when the client
/// accepts it; shorter ones are sent as written. Optionally decodes gzip request bodies
/// before the rest of the chain runs.
#[derive(Debug, Clone)]
pub struct Gzip {
    policy: Arc<CompressionPolicy>,
    pool: Arc<CompressorPool>,
    decompressor: Option<Arc<dyn Decompressor>>,
}

impl Gzip {
    /// Middleware compressing at `level` with default options
    pub fn new(level: CompressionLevel) -> Self {
        Self::from_parts(CompressionPolicy::default(), level, DEFAULT_MAX_IDLE, None)
    }

    /// Start building a middleware
    pub fn builder() -> GzipBuilder {
        GzipBuilder::default()
    }

    /// Build from a configuration section
    pub fn from_config(config: &GzipConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .level(config.level)
            .min_length(config.min_length)
            .excluded_extensions(config.excluded_extensions.iter().cloned())
            .excluded_paths(config.excluded_paths.iter().cloned())
            .excluded_path_regexes(config.excluded_path_regexes.iter().cloned())
            .max_idle(config.max_idle);
        if config.decompress_requests {
            builder = builder.decompressor(GzipDecompressor);
        }
        builder.build()
    }

    fn from_parts(
        policy: CompressionPolicy,
        level: CompressionLevel,
        max_idle: usize,
        decompressor: Option<Arc<dyn Decompressor>>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            pool: Arc::new(CompressorPool::new(level, max_idle)),
            decompressor,
        }
    }

    /// Compression policy applied to each request
    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Compressor pool backing this middleware
    pub fn pool(&self) -> &Arc<CompressorPool> {
        &self.pool
    }
}

#[async_trait]
impl Middleware for Gzip {
    async fn call(&self, ctx: &mut Context, next: Next) -> Result<()> {
        if let Some(decompressor) = &self.decompressor {
            if ctx.header(CONTENT_ENCODING) == Some("gzip") {
                decompressor.decompress(ctx).await?;
            }
        }

        if !self.policy.should_compress(ctx.request()) {
            return next.run(ctx).await;
        }

        let compressor = self.pool.checkout();
        let inner = ctx.take_writer();
        ctx.set_writer(Box::new(GzipWriter::new(
            inner,
            compressor,
            self.policy.min_length(),
        )));

        let outcome = next.run(ctx).await;

        let mut writer = ctx.take_writer();
        if let Err(e) = writer.finish().await {
            tracing::error!(error = %e, "Failed to complete gzip response");
            ctx.error(e);
        }
        match writer.into_inner() {
            Some(inner) => ctx.set_writer(inner),
            None => {
                return Err(Error::Internal(
                    "gzip writer was replaced during the request".to_string(),
                ))
            }
        }

        outcome
    }
}

/// Builder for [`Gzip`]
#[derive(Debug, Default)]
pub struct GzipBuilder {
    level: CompressionLevel,
    min_length: usize,
    excluded_extensions: Option<Vec<String>>,
    excluded_paths: Vec<String>,
    excluded_path_regexes: Vec<String>,
    decompressor: Option<Arc<dyn Decompressor>>,
    max_idle: Option<usize>,
}

impl GzipBuilder {
    /// Compression level
    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Minimum response length before compressing; 0 compresses everything
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Replace the excluded extension set (default `.png .gif .jpeg .jpg`)
    pub fn excluded_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the excluded path prefixes
    pub fn excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the excluded path patterns
    pub fn excluded_path_regexes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_path_regexes = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Decode request bodies declaring `Content-Encoding: gzip`
    pub fn decompressor(mut self, decompressor: impl Decompressor + 'static) -> Self {
        self.decompressor = Some(Arc::new(decompressor));
        self
    }

    /// Idle compressors kept between requests
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Build the middleware, compiling the path patterns
    pub fn build(self) -> Result<Gzip> {
        let excluded_path_regexes = ExcludedPathRegexes::new(&self.excluded_path_regexes)
            .map_err(|e| Error::Config(format!("invalid excluded path regex: {}", e)))?;

        let policy = CompressionPolicy {
            min_length: self.min_length,
            excluded_extensions: self
                .excluded_extensions
                .map(ExcludedExtensions::new)
                .unwrap_or_default(),
            excluded_paths: ExcludedPaths::new(self.excluded_paths),
            excluded_path_regexes,
        };

        Ok(Gzip::from_parts(
            policy,
            self.level,
            self.max_idle.unwrap_or(DEFAULT_MAX_IDLE),
            self.decompressor,
        ))
    }
}
