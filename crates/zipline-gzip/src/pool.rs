//! Pool of reusable compressors

use crate::compressor::Compressor;
use crate::config::{CompressionLevel, DEFAULT_MAX_IDLE};
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

/// Compressors at one level, shared by all requests of a middleware instance
pub struct CompressorPool {
    level: CompressionLevel,
    max_idle: usize,
    idle: Mutex<Vec<Compressor>>,
}

impl CompressorPool {
    /// Create an empty pool keeping up to `max_idle` idle compressors
    pub fn new(level: CompressionLevel, max_idle: usize) -> Self {
        Self {
            level,
            max_idle,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Level of every compressor handed out
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Compressors currently idle
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Take a freshly reset compressor; never blocks
    ///
    /// The compressor goes back to the pool when the guard drops.
    pub fn checkout(self: &Arc<Self>) -> PooledCompressor {
        let recycled = self.idle.lock().pop();

        let compressor = match recycled {
            Some(mut compressor) => match compressor.reset() {
                Ok(()) => compressor,
                Err(e) => {
                    trace!(error = %e, "Discarding compressor that failed to reset");
                    Compressor::new(self.level)
                }
            },
            None => {
                trace!(level = %self.level, "Compressor pool empty, allocating");
                Compressor::new(self.level)
            }
        };

        PooledCompressor {
            compressor: Some(compressor),
            pool: Arc::clone(self),
        }
    }

    fn put(&self, compressor: Compressor) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(compressor);
        }
    }
}

impl Default for CompressorPool {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT, DEFAULT_MAX_IDLE)
    }
}

impl fmt::Debug for CompressorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressorPool")
            .field("level", &self.level)
            .field("max_idle", &self.max_idle)
            .field("idle", &self.idle())
            .finish()
    }
}

/// Compressor on loan from a [`CompressorPool`]
pub struct PooledCompressor {
    compressor: Option<Compressor>,
    pool: Arc<CompressorPool>,
}

impl Deref for PooledCompressor {
    type Target = Compressor;

    fn deref(&self) -> &Compressor {
        self.compressor
            .as_ref()
            .expect("compressor is present until drop")
    }
}

impl DerefMut for PooledCompressor {
    fn deref_mut(&mut self) -> &mut Compressor {
        self.compressor
            .as_mut()
            .expect("compressor is present until drop")
    }
}

impl Drop for PooledCompressor {
    fn drop(&mut self) {
        if let Some(compressor) = self.compressor.take() {
            self.pool.put(compressor);
        }
    }
}

impl fmt::Debug for PooledCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledCompressor")
            .field(&self.compressor)
            .finish()
    }
}
