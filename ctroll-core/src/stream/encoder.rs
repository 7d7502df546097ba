//! Frame payload encoder.
//!
//! Produces the compressed bytes carried by Diff and Full messages:
//!
//! - **Full frame**: one checkerboard half of the raster (`width / 2`
//!   pixels per row), compressed as a `width / 2 × height` image.
//! - **Diff frame**: the packed 8×8 tiles from the diff engine,
//!   compressed as an `8 × 8·n` image.
//!
//! The lossy codec itself sits behind [`FrameCompressor`]; the default is
//! baseline JPEG.

use std::io::Cursor;

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::config::EncoderConfig;
use crate::error::StreamError;
use crate::stream::diff::BLOCK_SIZE;
use crate::stream::types::{BYTES_PER_PIXEL, Parity, Raster};

// ── FrameCompressor ──────────────────────────────────────────────

/// A lossy RGB image compressor.
pub trait FrameCompressor {
    /// Compress a tightly packed RGB image. `quality` is 1..=100.
    fn compress(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, StreamError>;
}

/// Baseline JPEG through the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCompressor;

impl FrameCompressor for JpegCompressor {
    fn compress(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Vec<u8>, StreamError> {
        let mut out = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode(pixels, width, height, ExtendedColorType::Rgb8)?;
        Ok(out.into_inner())
    }
}

// ── Checkerboard ─────────────────────────────────────────────────

/// Extract one checkerboard half of `raster` into `out`.
///
/// Pixel `(x, y)` is kept when `x + y + parity` is even. Each output row
/// holds exactly `width / 2` pixels. Returns the half's dimensions.
pub fn checkerboard_half(raster: &Raster, parity: Parity, out: &mut Vec<u8>) -> (u32, u32) {
    let half_width = raster.width() / 2;
    out.clear();
    out.reserve(half_width as usize * raster.height() as usize * BYTES_PER_PIXEL);

    for y in 0..raster.height() {
        let row = raster.row(y);
        let first = ((y + parity.bit()) % 2) as usize;
        row.chunks_exact(BYTES_PER_PIXEL)
            .skip(first)
            .step_by(2)
            .take(half_width as usize)
            .for_each(|px| out.extend_from_slice(px));
    }

    (half_width, raster.height())
}

// ── FrameEncoder ─────────────────────────────────────────────────

/// Turns rasters and packed tiles into wire payloads.
pub struct FrameEncoder<C = JpegCompressor> {
    compressor: C,
    config: EncoderConfig,
    /// Reused checkerboard scratch buffer.
    half: Vec<u8>,
}

impl FrameEncoder<JpegCompressor> {
    pub fn new(config: EncoderConfig) -> Self {
        Self::with_compressor(JpegCompressor, config)
    }
}

impl<C: FrameCompressor> FrameEncoder<C> {
    pub fn with_compressor(compressor: C, config: EncoderConfig) -> Self {
        Self {
            compressor,
            config,
            half: Vec::new(),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Compress the `parity` checkerboard half of `raster`.
    pub fn encode_full(&mut self, raster: &Raster, parity: Parity) -> Result<Vec<u8>, StreamError> {
        let (width, height) = checkerboard_half(raster, parity, &mut self.half);
        self.compressor
            .compress(&self.half, width, height, clamp_quality(self.config.full_quality))
    }

    /// Compress `count` packed tiles as one tall 8-pixel-wide image.
    pub fn encode_blocks(&self, packed: &[u8], count: usize) -> Result<Vec<u8>, StreamError> {
        let height = u32::try_from(count * BLOCK_SIZE)
            .map_err(|_| StreamError::EncodeFailed(format!("{count} tiles exceed image height")))?;
        self.compressor.compress(
            packed,
            BLOCK_SIZE as u32,
            height,
            clamp_quality(self.config.diff_quality),
        )
    }
}

fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

// ── Tests ────────────────────────────────────────────────────────
