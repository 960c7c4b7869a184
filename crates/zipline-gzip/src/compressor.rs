//! Resettable gzip encoder
//!
//! flate2's `GzEncoder` cannot be reset in place, so the gzip framing is written here
//! around a resettable raw DEFLATE encoder and a CRC-32 tracker.

use crate::config::CompressionLevel;
use flate2::write::DeflateEncoder;
use flate2::CrcWriter;
use std::io::{self, Write};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const OS_UNKNOWN: u8 = 0xff;

/// Streaming gzip encoder writing into an internal staging buffer
///
/// Compressed bytes accumulate until [`take_output`](Compressor::take_output) hands them
/// off. One instance serves one response at a time and is recycled through
/// [`CompressorPool`](crate::pool::CompressorPool).
pub struct Compressor {
    encoder: CrcWriter<DeflateEncoder<Vec<u8>>>,
    level: CompressionLevel,
    header_pending: bool,
}

impl Compressor {
    /// Create an encoder at `level`
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            encoder: CrcWriter::new(DeflateEncoder::new(Vec::new(), level.into())),
            level,
            header_pending: true,
        }
    }

    /// Level this encoder compresses at
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Compress `data`
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_header();
        self.encoder.write_all(data)
    }

    /// Sync-flush so everything written so far can be decoded by the client
    pub fn flush(&mut self) -> io::Result<()> {
        self.write_header();
        self.encoder.flush()
    }

    /// Finish the stream, appending the gzip trailer
    pub fn finish(&mut self) -> io::Result<()> {
        self.write_header();
        self.encoder.get_mut().try_finish()?;

        let crc = self.encoder.crc();
        let (sum, amount) = (crc.sum(), crc.amount());
        let out = self.encoder.get_mut().get_mut();
        out.extend_from_slice(&sum.to_le_bytes());
        out.extend_from_slice(&amount.to_le_bytes());
        Ok(())
    }

    /// Take the compressed bytes produced so far
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(self.encoder.get_mut().get_mut())
    }

    /// Discard all state and output, readying the encoder for a new stream
    pub fn reset(&mut self) -> io::Result<()> {
        let mut staging = self.encoder.get_mut().reset(Vec::new())?;
        staging.clear();
        *self.encoder.get_mut().get_mut() = staging;
        self.encoder.reset();
        self.header_pending = true;
        Ok(())
    }

    /// Uncompressed bytes written since the last reset
    pub fn total_in(&self) -> u32 {
        self.encoder.crc().amount()
    }

    fn write_header(&mut self) {
        if !self.header_pending {
            return;
        }
        self.header_pending = false;

        // Same XFL flags flate2's GzBuilder derives from the level.
        let xfl = match self.level.get() {
            9 => 2,
            0 | 1 => 4,
            _ => 0,
        };
        let out = self.encoder.get_mut().get_mut();
        out.extend_from_slice(&GZIP_MAGIC);
        out.extend_from_slice(&[METHOD_DEFLATE, 0, 0, 0, 0, 0, xfl, OS_UNKNOWN]);
    }
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("level", &self.level)
            .field("total_in", &self.total_in())
            .field("staged", &self.encoder.get_ref().get_ref().len())
            .finish()
    }
}
