//! Block-level change detection between consecutive frames.
//!
//! Divides the raster into 8×8 tiles and compares each against a retained
//! reference frame. Changed tiles are flagged in a [`DiffBitmap`], copied
//! into the reference and packed back to back so the encoder can compress
//! them as one tall, 8-pixel-wide image.
//!
//! Only whole tiles are scanned. When the raster size is not a multiple of
//! 8 the trailing pixels are never compared and their bitmap bits stay
//! clear.

use crate::config::FramePolicy;
use crate::stream::types::{BYTES_PER_PIXEL, Raster};

/// Tile edge in pixels.
pub const BLOCK_SIZE: usize = 8;
/// Bytes in one packed tile.
pub const BLOCK_BYTES: usize = BLOCK_SIZE * BLOCK_SIZE * BYTES_PER_PIXEL;

const BLOCK_ROW_BYTES: usize = BLOCK_SIZE * BYTES_PER_PIXEL;

// ── DiffBitmap ───────────────────────────────────────────────────

/// One bit per tile, row-major, least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBitmap {
    blocks_x: usize,
    blocks_y: usize,
    bits: Vec<u8>,
}

impl DiffBitmap {
    /// An all-clear bitmap covering a `width × height` raster.
    pub fn new(width: u32, height: u32) -> Self {
        let blocks_x = (width as usize).div_ceil(BLOCK_SIZE);
        let blocks_y = (height as usize).div_ceil(BLOCK_SIZE);
        Self {
            blocks_x,
            blocks_y,
            bits: vec![0; Self::byte_len_for(width, height)],
        }
    }

    /// Wire size of the bitmap for a `width × height` raster.
    pub fn byte_len_for(width: u32, height: u32) -> usize {
        let blocks =
            (width as usize).div_ceil(BLOCK_SIZE) * (height as usize).div_ceil(BLOCK_SIZE);
        blocks.div_ceil(8)
    }

    pub fn blocks_x(&self) -> usize {
        self.blocks_x
    }

    pub fn blocks_y(&self) -> usize {
        self.blocks_y
    }

    /// Whether the tile at block coordinates `(bx, by)` changed.
    pub fn is_set(&self, bx: usize, by: usize) -> bool {
        let index = by * self.blocks_x + bx;
        self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Number of flagged tiles.
    pub fn count_set(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    fn assign(&mut self, index: usize, changed: bool) {
        let mask = 1u8 << (index % 8);
        if changed {
            self.bits[index / 8] |= mask;
        } else {
            self.bits[index / 8] &= !mask;
        }
    }
}

// ── DiffOutcome ──────────────────────────────────────────────────

/// Result of one [`BlockDiffEngine::diff`] pass.
#[derive(Debug)]
pub enum DiffOutcome<'a> {
    /// No reference existed (first frame or size change); the caller
    /// must send a full frame.
    NoReference,
    /// Tiles were compared against the reference.
    Diff(DiffResult<'a>),
}

/// Changed tiles of one pass. Only meaningful until the next pass.
#[derive(Debug, Clone, Copy)]
pub struct DiffResult<'a> {
    pub bitmap: &'a DiffBitmap,
    /// `changed_count` tiles of [`BLOCK_BYTES`] each, in bitmap order.
    pub packed_blocks: &'a [u8],
    pub changed_count: usize,
    /// Number of whole tiles that were scanned.
    pub total_blocks: usize,
}

// ── BlockDiffEngine ──────────────────────────────────────────────

/// Stateful detector that retains the last observed tiles.
pub struct BlockDiffEngine {
    reference: Option<Raster>,
    bitmap: DiffBitmap,
    packed: Vec<u8>,
    threshold: u32,
}

impl BlockDiffEngine {
    /// Create an engine that flags a tile once its summed channel
    /// difference exceeds `threshold`.
    pub fn new(threshold: u32) -> Self {
        Self {
            reference: None,
            bitmap: DiffBitmap::new(0, 0),
            packed: Vec::new(),
            threshold,
        }
    }

    pub fn from_policy(policy: &FramePolicy) -> Self {
        Self::new(policy.block_threshold)
    }

    /// Forget the reference; the next pass reports [`DiffOutcome::NoReference`].
    pub fn reset(&mut self) {
        self.reference = None;
    }

    /// The retained reference frame, if any.
    pub fn reference(&self) -> Option<&Raster> {
        self.reference.as_ref()
    }

    /// Compare `current` against the reference and fold changed tiles
    /// into it.
    pub fn diff(&mut self, current: &Raster) -> DiffOutcome<'_> {
        let comparable = matches!(&self.reference, Some(r) if r.same_size(current));
        if !comparable {
            self.reference = Some(current.to_packed());
            self.bitmap = DiffBitmap::new(current.width(), current.height());
            self.packed.clear();
            return DiffOutcome::NoReference;
        }
        let Some(reference) = self.reference.as_mut() else {
            return DiffOutcome::NoReference;
        };

        let full_x = current.width() as usize / BLOCK_SIZE;
        let full_y = current.height() as usize / BLOCK_SIZE;
        let blocks_x = self.bitmap.blocks_x();

        self.packed.clear();
        let mut changed_count = 0;

        for by in 0..full_y {
            for bx in 0..full_x {
                let x0 = bx * BLOCK_SIZE;
                let y0 = by * BLOCK_SIZE;
                let changed = block_differs(current, reference, x0, y0, self.threshold);
                if changed {
                    copy_block(current, reference, x0, y0);
                    pack_block(current, &mut self.packed, x0, y0);
                    changed_count += 1;
                }
                self.bitmap.assign(by * blocks_x + bx, changed);
            }
        }

        DiffOutcome::Diff(DiffResult {
            bitmap: &self.bitmap,
            packed_blocks: &self.packed,
            changed_count,
            total_blocks: full_x * full_y,
        })
    }
}

// ── Tile helpers ─────────────────────────────────────────────────

/// Bounded sum of absolute differences over one tile.
fn block_differs(current: &Raster, reference: &Raster, x0: usize, y0: usize, threshold: u32) -> bool {
    let left = x0 * BYTES_PER_PIXEL;
    let mut sum = 0u32;

    for y in y0..y0 + BLOCK_SIZE {
        let cur = &current.data()[y * current.stride() + left..][..BLOCK_ROW_BYTES];
        let prev = &reference.data()[y * reference.stride() + left..][..BLOCK_ROW_BYTES];

        for (a, b) in cur.chunks_exact(BYTES_PER_PIXEL).zip(prev.chunks_exact(BYTES_PER_PIXEL)) {
            sum += a[0].abs_diff(b[0]) as u32;
            sum += a[1].abs_diff(b[1]) as u32;
            sum += a[2].abs_diff(b[2]) as u32;
            if sum > threshold {
                return true;
            }
        }
    }
    false
}

fn copy_block(current: &Raster, reference: &mut Raster, x0: usize, y0: usize) {
    let left = x0 * BYTES_PER_PIXEL;
    let ref_stride = reference.stride();
    for y in y0..y0 + BLOCK_SIZE {
        let src = &current.data()[y * current.stride() + left..][..BLOCK_ROW_BYTES];
        reference.data_mut()[y * ref_stride + left..][..BLOCK_ROW_BYTES].copy_from_slice(src);
    }
}

fn pack_block(current: &Raster, out: &mut Vec<u8>, x0: usize, y0: usize) {
    let left = x0 * BYTES_PER_PIXEL;
    for y in y0..y0 + BLOCK_SIZE {
        out.extend_from_slice(&current.data()[y * current.stride() + left..][..BLOCK_ROW_BYTES]);
    }
}

// ── Tests ────────────────────────────────────────────────────────
