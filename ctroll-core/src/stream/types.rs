//! Shared raster types used between pipeline stages.

use crate::error::StreamError;

/// Bytes per RGB pixel.
pub const BYTES_PER_PIXEL: usize = 3;

// ── Raster ───────────────────────────────────────────────────────

/// A captured RGB image.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may exceed `width * 3` when the capture side pads rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap a tightly packed RGB buffer (`stride == width * 3`).
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, StreamError> {
        Self::with_stride(width, height, width as usize * BYTES_PER_PIXEL, data)
    }

    /// Wrap an RGB buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, StreamError> {
        let row_len = width as usize * BYTES_PER_PIXEL;
        if stride < row_len {
            return Err(StreamError::InvalidRaster(format!(
                "stride {stride} shorter than row of {row_len} bytes"
            )));
        }
        let expected = stride.checked_mul(height as usize).ok_or_else(|| {
            StreamError::InvalidRaster(format!("{height} rows of stride {stride} overflow"))
        })?;
        if data.len() < expected {
            return Err(StreamError::InvalidRaster(format!(
                "buffer holds {} bytes, {width}x{height} with stride {stride} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// A tightly packed raster with every channel set to `fill`.
    pub fn filled(width: u32, height: u32, fill: u8) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            data: vec![fill; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel bytes of row `y`, without trailing padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// The RGB triple at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Overwrite the RGB triple at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgb);
    }

    /// Copy with padding removed (`stride == width * 3`).
    pub fn to_packed(&self) -> Raster {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * BYTES_PER_PIXEL);
        for y in 0..self.height {
            data.extend_from_slice(self.row(y));
        }
        Raster {
            width: self.width,
            height: self.height,
            stride: self.width as usize * BYTES_PER_PIXEL,
            data,
        }
    }

    /// Whether `other` has the same width and height.
    pub fn same_size(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }
}

// ── Parity ───────────────────────────────────────────────────────

/// Which checkerboard half a full frame carries.
///
/// Pixel `(x, y)` belongs to the even half when `x + y` is even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    #[default]
    Even,
    Odd,
}

impl Parity {
    pub fn flipped(self) -> Self {
        match self {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        }
    }

    /// 0 for even, 1 for odd.
    pub const fn bit(self) -> u32 {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = Raster::new(16, 16, vec![0; 10]).unwrap_err();
        assert!(matches!(err, StreamError::InvalidRaster(_)));
    }

    #[test]
    fn rejects_stride_shorter_than_row() {
        assert!(Raster::with_stride(16, 2, 40, vec![0; 80]).is_err());
    }

    #[test]
    fn rejects_stride_that_overflows_buffer_size() {
        let err = Raster::with_stride(16, 2, usize::MAX, vec![0; 96]).unwrap_err();
        assert!(matches!(err, StreamError::InvalidRaster(_)));
    }

    #[test]
    fn padded_rows_are_trimmed() {
        let mut data = vec![0u8; 2 * 8];
        data[6] = 0xEE; // padding byte of row 0
        data[8] = 7;
        let raster = Raster::with_stride(2, 2, 8, data).unwrap();
        assert_eq!(raster.row(0).len(), 6);
        assert_eq!(raster.pixel(0, 1), [7, 0, 0]);
    }

    #[test]
    fn parity_flips() {
        assert_eq!(Parity::Even.flipped(), Parity::Odd);
        assert_eq!(Parity::Odd.flipped().bit(), 0);
    }
}
