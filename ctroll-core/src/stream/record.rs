//! Control-state records streamed back by the remote device.
//!
//! The peer sends a continuous sequence of fixed-size 22-byte records
//! with no framing. [`RecordAssembler`] rebuilds them from reads of any
//! size.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Pressed-button bitmask, in the device's HID bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u16 {
        const A = 1 << 0;
        const B = 1 << 1;
        const SELECT = 1 << 2;
        const START = 1 << 3;
        const DPAD_RIGHT = 1 << 4;
        const DPAD_LEFT = 1 << 5;
        const DPAD_UP = 1 << 6;
        const DPAD_DOWN = 1 << 7;
        const R = 1 << 8;
        const L = 1 << 9;
        const X = 1 << 10;
        const Y = 1 << 11;
        const ZL = 1 << 14;
        const ZR = 1 << 15;
    }
}

// ── ControlRecord ────────────────────────────────────────────────

/// Snapshot of the remote device's controls and motion sensors.
///
/// Wire layout (little-endian, 22 bytes):
/// ```text
/// pressed_buttons: u16   circle_pad_x: i16   circle_pad_y: i16
/// touch_x: u16           touch_y: u16
/// accel_x: u16  accel_y: u16  accel_z: u16
/// gyro_x: u16   gyro_y: u16   gyro_z: u16
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlRecord {
    pub pressed_buttons: u16,
    pub circle_pad_x: i16,
    pub circle_pad_y: i16,
    pub touch_x: u16,
    pub touch_y: u16,
    pub accel_x: u16,
    pub accel_y: u16,
    pub accel_z: u16,
    pub gyro_x: u16,
    pub gyro_y: u16,
    pub gyro_z: u16,
}

impl ControlRecord {
    /// Encoded size on the wire.
    pub const SIZE: usize = 22;

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.pressed_buttons.to_le_bytes());
        buf[2..4].copy_from_slice(&self.circle_pad_x.to_le_bytes());
        buf[4..6].copy_from_slice(&self.circle_pad_y.to_le_bytes());
        buf[6..8].copy_from_slice(&self.touch_x.to_le_bytes());
        buf[8..10].copy_from_slice(&self.touch_y.to_le_bytes());
        buf[10..12].copy_from_slice(&self.accel_x.to_le_bytes());
        buf[12..14].copy_from_slice(&self.accel_y.to_le_bytes());
        buf[14..16].copy_from_slice(&self.accel_z.to_le_bytes());
        buf[16..18].copy_from_slice(&self.gyro_x.to_le_bytes());
        buf[18..20].copy_from_slice(&self.gyro_y.to_le_bytes());
        buf[20..22].copy_from_slice(&self.gyro_z.to_le_bytes());
        buf
    }

    /// Deserialize from exactly one record's bytes.
    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        let u = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([buf[i], buf[i + 1]]);
        Self {
            pressed_buttons: u(0),
            circle_pad_x: s(2),
            circle_pad_y: s(4),
            touch_x: u(6),
            touch_y: u(8),
            accel_x: u(10),
            accel_y: u(12),
            accel_z: u(14),
            gyro_x: u(16),
            gyro_y: u(18),
            gyro_z: u(20),
        }
    }

    /// The pressed buttons as flags. Unknown bits are kept.
    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits_retain(self.pressed_buttons)
    }
}

// ── RecordAssembler ──────────────────────────────────────────────

/// Fixed-size accumulation buffer with a persistent write cursor.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    buf: [u8; ControlRecord::SIZE],
    filled: usize,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self {
            buf: [0; ControlRecord::SIZE],
            filled: 0,
        }
    }

    /// Bytes of the record in progress.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Free space before the current record is complete.
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Account for `n` bytes written into [`remaining_mut`](Self::remaining_mut).
    /// Returns the record if it is now complete.
    pub fn advance(&mut self, n: usize) -> Option<ControlRecord> {
        self.filled = (self.filled + n).min(ControlRecord::SIZE);
        if self.filled < ControlRecord::SIZE {
            return None;
        }
        self.filled = 0;
        Some(ControlRecord::decode(&self.buf))
    }

    /// Feed a chunk of any size. Returns the last record completed by it;
    /// earlier records completed in the same chunk are superseded.
    pub fn feed(&mut self, mut bytes: &[u8]) -> Option<ControlRecord> {
        let mut latest = None;
        while !bytes.is_empty() {
            let space = self.remaining_mut();
            let n = space.len().min(bytes.len());
            space[..n].copy_from_slice(&bytes[..n]);
            bytes = &bytes[n..];
            if let Some(record) = self.advance(n) {
                latest = Some(record);
            }
        }
        latest
    }

    /// Discard any partial record.
    pub fn clear(&mut self) {
        self.filled = 0;
    }
}

// ── Tests ────────────────────────────────────────────────────────
