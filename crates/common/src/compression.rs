//! Byte compression with optional base64 text encoding.
//!
//! Text-only backends (Redis strings, JSON fields) store compressed bytes as
//! base64 via [`CompressionService::compress_to_base64`].

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::{CommonError, CommonResult};

/// Compression algorithms supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionAlgorithm {
    #[default]
    Gzip,
    Zlib,
}

impl CompressionAlgorithm {
    const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "Gzip",
            Self::Zlib => "Zlib",
        }
    }
}

/// Stateless compressor for a fixed algorithm and level
#[derive(Debug, Clone, Copy)]
pub struct CompressionService {
    algorithm: CompressionAlgorithm,
    level: u32,
}

impl CompressionService {
    /// Create new compression service; `level` is clamped to 0-9
    pub fn new(algorithm: CompressionAlgorithm, level: u32) -> Self {
        Self { algorithm, level: level.min(9) }
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Compress data
    pub fn compress(&self, data: &[u8]) -> CommonResult<Vec<u8>> {
        let level = Compression::new(self.level);
        let name = self.algorithm.name();
        let failed = |e: std::io::Error| CommonError::encoding(format!("{name} compression failed: {e}"));

        match self.algorithm {
            CompressionAlgorithm::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(data).map_err(failed)?;
                encoder.finish().map_err(failed)
            }
            CompressionAlgorithm::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(data).map_err(failed)?;
                encoder.finish().map_err(failed)
            }
        }
    }

    /// Decompress data
    pub fn decompress(&self, data: &[u8]) -> CommonResult<Vec<u8>> {
        let name = self.algorithm.name();
        let mut decompressed = Vec::new();
        let result = match self.algorithm {
            CompressionAlgorithm::Gzip => GzDecoder::new(data).read_to_end(&mut decompressed),
            CompressionAlgorithm::Zlib => ZlibDecoder::new(data).read_to_end(&mut decompressed),
        };
        result.map_err(|e| CommonError::encoding(format!("{name} decompression failed: {e}")))?;
        Ok(decompressed)
    }

    /// Compress and encode as standard base64
    pub fn compress_to_base64(&self, data: &[u8]) -> CommonResult<String> {
        Ok(BASE64.encode(self.compress(data)?))
    }

    /// Decode standard base64 and decompress
    pub fn decompress_from_base64(&self, encoded: &str) -> CommonResult<Vec<u8>> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| CommonError::encoding(format!("invalid base64: {e}")))?;
        self.decompress(&bytes)
    }

    /// Space saved as a percentage of the original size
    #[allow(clippy::cast_precision_loss)] // payload sizes stay below 2^52
    pub fn compression_ratio(&self, original: usize, compressed: usize) -> f64 {
        if original == 0 {
            return 0.0;
        }
        (1.0 - (compressed as f64 / original as f64)) * 100.0
    }
}

impl Default for CompressionService {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::Gzip, 6)
    }
}
