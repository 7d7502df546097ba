//! Frame sources feeding the host tick loop.

use ctroll_core::Raster;

/// Produces the frame to offer on each tick.
pub trait FrameSource {
    /// The current frame, or `None` when nothing new was captured this
    /// tick.
    fn next_frame(&mut self) -> Option<&Raster>;
}

// ── TestPattern ──────────────────────────────────────────────────

const BAR_WIDTH: u32 = 32;

const PALETTE: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Vertical colour bars scrolling one pixel every `step_frames` frames.
///
/// Frames between steps are identical, so a connected peer sees a mix
/// of diff and no-change messages.
pub struct TestPattern {
    raster: Raster,
    step_frames: u32,
    frame: u64,
    offset: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, step_frames: u32) -> Self {
        let mut pattern = Self {
            raster: Raster::filled(width, height, 0),
            step_frames: step_frames.max(1),
            frame: 0,
            offset: 0,
        };
        pattern.draw();
        pattern
    }

    /// Horizontal scroll position in pixels.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    fn draw(&mut self) {
        let (width, height) = (self.raster.width(), self.raster.height());
        for x in 0..width {
            let bar = ((x + self.offset) / BAR_WIDTH) as usize % PALETTE.len();
            for y in 0..height {
                self.raster.set_pixel(x, y, PALETTE[bar]);
            }
        }
    }
}

impl FrameSource for TestPattern {
    fn next_frame(&mut self) -> Option<&Raster> {
        if self.frame > 0 && self.frame % u64::from(self.step_frames) == 0 {
            self.offset = self.offset.wrapping_add(1);
            self.draw();
        }
        self.frame += 1;
        Some(&self.raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scroll_every_step() {
        let mut pattern = TestPattern::new(64, 8, 2);
        let first = pattern.next_frame().unwrap().clone();
        let second = pattern.next_frame().unwrap().clone();
        assert_eq!(first, second);

        let third = pattern.next_frame().unwrap().clone();
        assert_ne!(first, third);
        assert_eq!(pattern.offset(), 1);
        assert_eq!(third.pixel(30, 0), PALETTE[0]);
        assert_eq!(third.pixel(31, 0), PALETTE[1]);
    }
}
