//! Outbound wire protocol.
//!
//! Every message starts with a little-endian `u16` tag. All but
//! `NoChange` carry a `u16` length prefix and that many compressed bytes;
//! `Diff` additionally carries the block bitmap, whose size is fixed by
//! the raster dimensions and therefore not prefixed.
//!
//! ```text
//! NoChange:  tag=0
//! Diff:      tag=2 | len:u16 | bitmap[bitmap_len] | payload[len]
//! FullEven:  tag=3 | len:u16 | payload[len]
//! FullOdd:   tag=4 | len:u16 | payload[len]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::StreamError;
use crate::stream::diff::DiffBitmap;
use crate::stream::types::Parity;

/// Size of the tag field.
pub const TAG_SIZE: usize = 2;
/// Size of the payload length prefix.
pub const LENGTH_SIZE: usize = 2;
/// Largest payload the length prefix can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

// ── FrameTypeTag ─────────────────────────────────────────────────

/// Selects how the bytes after the tag are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameTypeTag {
    NoChange = 0,
    Diff = 2,
    FullEven = 3,
    FullOdd = 4,
}

impl FrameTypeTag {
    /// The full-frame tag for a checkerboard half.
    pub fn full(parity: Parity) -> Self {
        match parity {
            Parity::Even => FrameTypeTag::FullEven,
            Parity::Odd => FrameTypeTag::FullOdd,
        }
    }

    pub fn is_full(self) -> bool {
        matches!(self, FrameTypeTag::FullEven | FrameTypeTag::FullOdd)
    }
}

impl TryFrom<u16> for FrameTypeTag {
    type Error = StreamError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameTypeTag::NoChange),
            2 => Ok(FrameTypeTag::Diff),
            3 => Ok(FrameTypeTag::FullEven),
            4 => Ok(FrameTypeTag::FullOdd),
            other => Err(StreamError::UnknownVariant {
                type_name: "FrameTypeTag",
                value: other as u64,
            }),
        }
    }
}

// ── FrameMessage ─────────────────────────────────────────────────

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    NoChange,
    Diff { bitmap: Bytes, payload: Bytes },
    Full { parity: Parity, payload: Bytes },
}

impl FrameMessage {
    pub fn tag(&self) -> FrameTypeTag {
        match self {
            FrameMessage::NoChange => FrameTypeTag::NoChange,
            FrameMessage::Diff { .. } => FrameTypeTag::Diff,
            FrameMessage::Full { parity, .. } => FrameTypeTag::full(*parity),
        }
    }

    /// Bytes this message occupies on the wire.
    pub fn wire_len(&self) -> usize {
        match self {
            FrameMessage::NoChange => TAG_SIZE,
            FrameMessage::Diff { bitmap, payload } => {
                TAG_SIZE + LENGTH_SIZE + bitmap.len() + payload.len()
            }
            FrameMessage::Full { payload, .. } => TAG_SIZE + LENGTH_SIZE + payload.len(),
        }
    }
}

// ── FrameCodec ───────────────────────────────────────────────────

/// Length-prefixed codec for [`FrameMessage`].
///
/// Encoding works for any raster size. Decoding needs the bitmap size,
/// which the receiver derives from the raster dimensions it expects.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    bitmap_len: usize,
}

impl FrameCodec {
    pub fn new(bitmap_len: usize) -> Self {
        Self { bitmap_len }
    }

    /// Codec for a `width × height` stream.
    pub fn for_raster(width: u32, height: u32) -> Self {
        Self::new(DiffBitmap::byte_len_for(width, height))
    }

    pub fn bitmap_len(&self) -> usize {
        self.bitmap_len
    }
}

impl Encoder<FrameMessage> for FrameCodec {
    type Error = StreamError;

    fn encode(&mut self, item: FrameMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload_len = match &item {
            FrameMessage::NoChange => 0,
            FrameMessage::Diff { payload, .. } | FrameMessage::Full { payload, .. } => {
                payload.len()
            }
        };
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(StreamError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        dst.reserve(item.wire_len());
        dst.put_u16_le(item.tag() as u16);
        match item {
            FrameMessage::NoChange => {}
            FrameMessage::Diff { bitmap, payload } => {
                dst.put_u16_le(payload.len() as u16);
                dst.extend_from_slice(&bitmap);
                dst.extend_from_slice(&payload);
            }
            FrameMessage::Full { payload, .. } => {
                dst.put_u16_le(payload.len() as u16);
                dst.extend_from_slice(&payload);
            }
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = FrameMessage;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < TAG_SIZE {
            return Ok(None);
        }
        let tag = FrameTypeTag::try_from(u16::from_le_bytes([src[0], src[1]]))?;

        // `None` marks a diff, which carries a bitmap ahead of its payload.
        let parity = match tag {
            FrameTypeTag::NoChange => {
                src.advance(TAG_SIZE);
                return Ok(Some(FrameMessage::NoChange));
            }
            FrameTypeTag::Diff => None,
            FrameTypeTag::FullEven => Some(Parity::Even),
            FrameTypeTag::FullOdd => Some(Parity::Odd),
        };

        if src.len() < TAG_SIZE + LENGTH_SIZE {
            return Ok(None);
        }
        let payload_len = u16::from_le_bytes([src[2], src[3]]) as usize;
        let bitmap_len = if parity.is_none() { self.bitmap_len } else { 0 };
        let total = TAG_SIZE + LENGTH_SIZE + bitmap_len + payload_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(TAG_SIZE + LENGTH_SIZE);
        let bitmap = frame.split_to(bitmap_len).freeze();
        let payload = frame.freeze();

        Ok(Some(match parity {
            None => FrameMessage::Diff { bitmap, payload },
            Some(parity) => FrameMessage::Full { parity, payload },
        }))
    }
}

// ── Tests ────────────────────────────────────────────────────────
