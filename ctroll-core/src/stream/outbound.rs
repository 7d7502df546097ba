//! Host-side frame channel.
//!
//! Drives the full outbound pipeline once per captured frame:
//!
//! 1. [`Link`] keeps the TCP session alive (cooldown-throttled connects).
//! 2. [`FrameScheduler`] decides whether a full frame is forced.
//! 3. [`BlockDiffEngine`] finds changed tiles when it is not.
//! 4. [`FrameEncoder`] compresses the checkerboard half and/or the tiles.
//! 5. [`FrameCodec`] frames the smaller candidate onto the wire.
//! 6. One advisory confirmation byte is read back, without waiting.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{debug, warn};

use crate::config::{EncoderConfig, FramePolicy, LinkConfig};
use crate::error::StreamError;
use crate::stream::diff::{BlockDiffEngine, DiffOutcome};
use crate::stream::encoder::{FrameCompressor, FrameEncoder, JpegCompressor};
use crate::stream::link::{ConnectionState, Link, LinkPoll};
use crate::stream::protocol::{FrameCodec, FrameMessage, FrameTypeTag};
use crate::stream::scheduler::{FrameScheduler, Plan};
use crate::stream::types::Raster;

// ── ChannelStats ─────────────────────────────────────────────────

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub no_change_frames: u64,
    pub diff_frames: u64,
    pub full_frames: u64,
    /// Frames not sent because the link was down or the frame failed.
    pub dropped_frames: u64,
    pub bytes_sent: u64,
    /// Sessions started (first connect included).
    pub sessions: u64,
}

// ── OutboundFrameChannel ─────────────────────────────────────────

/// Owns the outbound connection and all per-session frame state.
pub struct OutboundFrameChannel<C = JpegCompressor> {
    link: Link,
    engine: BlockDiffEngine,
    encoder: FrameEncoder<C>,
    scheduler: FrameScheduler,
    codec: FrameCodec,
    send_buf: BytesMut,
    stats: ChannelStats,
    last_sent: Option<FrameTypeTag>,
}

impl OutboundFrameChannel<JpegCompressor> {
    /// Channel streaming to `addr` with JPEG payloads.
    pub fn new(
        addr: SocketAddr,
        link: LinkConfig,
        policy: FramePolicy,
        encoder: EncoderConfig,
    ) -> Self {
        Self::with_compressor(addr, link, policy, encoder, JpegCompressor)
    }
}

impl<C: FrameCompressor> OutboundFrameChannel<C> {
    pub fn with_compressor(
        addr: SocketAddr,
        link: LinkConfig,
        policy: FramePolicy,
        encoder: EncoderConfig,
        compressor: C,
    ) -> Self {
        Self {
            link: Link::new("outbound", addr, link),
            engine: BlockDiffEngine::from_policy(&policy),
            encoder: FrameEncoder::with_compressor(compressor, encoder),
            scheduler: FrameScheduler::new(policy),
            codec: FrameCodec::new(0),
            send_buf: BytesMut::new(),
            stats: ChannelStats::default(),
            last_sent: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Tag of the most recent message that reached the socket.
    pub fn last_sent(&self) -> Option<FrameTypeTag> {
        self.last_sent
    }

    /// Make the next frame a full one.
    pub fn request_full_frame(&mut self) {
        self.scheduler.request_full_frame();
    }

    /// Send whatever `raster` calls for and return the peer's pending
    /// confirmation byte (0 when none has arrived).
    ///
    /// Never fails: a down link or a broken frame drops the frame and
    /// the next call starts over.
    pub async fn push_frame(&mut self, raster: &Raster) -> u8 {
        if !self.ensure_connected().await {
            self.stats.dropped_frames += 1;
            return 0;
        }

        match self.send_frame(raster).await {
            Ok(tag) => {
                debug!(?tag, force_frame = self.scheduler.force_frame(), "frame sent");
                self.last_sent = Some(tag);
            }
            Err(e) => {
                self.stats.dropped_frames += 1;
                if e.is_connection_loss() {
                    debug!("frame dropped with the link: {e}");
                } else {
                    // The reference already absorbed this frame; resync with a full one.
                    warn!("frame dropped: {e}");
                    self.engine.reset();
                }
            }
        }

        self.read_confirmation()
    }

    /// Tick without a new frame: keep the link alive and collect a
    /// pending confirmation byte.
    pub async fn poll_confirmation(&mut self) -> u8 {
        if !self.ensure_connected().await {
            return 0;
        }
        self.read_confirmation()
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn ensure_connected(&mut self) -> bool {
        match self.link.poll().await {
            LinkPoll::Up => true,
            LinkPoll::JustConnected => {
                // A new peer has seen nothing yet.
                self.engine.reset();
                self.scheduler.reset();
                self.stats.sessions += 1;
                true
            }
            LinkPoll::Down => false,
        }
    }

    async fn send_frame(&mut self, raster: &Raster) -> Result<FrameTypeTag, StreamError> {
        let forced = self.scheduler.begin_frame();
        let outcome = if forced {
            None
        } else {
            Some(self.engine.diff(raster))
        };
        let plan = self.scheduler.plan(forced, outcome.as_ref());
        let planned = match plan {
            Plan::NoChange => FrameTypeTag::NoChange,
            Plan::Compare { .. } => FrameTypeTag::Diff,
            Plan::Full => FrameTypeTag::full(self.scheduler.parity()),
        };

        // A frame that fails to encode still counts as sent.
        let message = match compose(&mut self.encoder, &self.scheduler, raster, plan, outcome) {
            Ok(message) => message,
            Err(e) => {
                self.scheduler.commit(planned);
                return Err(e);
            }
        };

        let tag = message.tag();
        self.send_buf.clear();
        if let Err(e) = self.codec.encode(message, &mut self.send_buf) {
            self.scheduler.commit(tag);
            return Err(e);
        }
        self.link.write_all(&self.send_buf).await?;

        self.scheduler.commit(tag);
        self.stats.bytes_sent += self.send_buf.len() as u64;
        match tag {
            FrameTypeTag::NoChange => self.stats.no_change_frames += 1,
            FrameTypeTag::Diff => self.stats.diff_frames += 1,
            FrameTypeTag::FullEven | FrameTypeTag::FullOdd => self.stats.full_frames += 1,
        }
        Ok(tag)
    }

    fn read_confirmation(&mut self) -> u8 {
        if !self.link.is_connected() {
            return 0;
        }
        let mut byte = [0u8; 1];
        match self.link.try_read(&mut byte) {
            Ok(Some(1)) => byte[0],
            Ok(_) => 0,
            Err(e) => {
                debug!("confirmation read: {e}");
                0
            }
        }
    }
}

/// Build the message for `plan`, encoding the candidates it calls for.
fn compose<C: FrameCompressor>(
    encoder: &mut FrameEncoder<C>,
    scheduler: &FrameScheduler,
    raster: &Raster,
    plan: Plan,
    outcome: Option<DiffOutcome<'_>>,
) -> Result<FrameMessage, StreamError> {
    let parity = scheduler.parity();
    let message = match (plan, outcome) {
        (Plan::NoChange, _) => FrameMessage::NoChange,
        (Plan::Compare { changed_count }, Some(DiffOutcome::Diff(diff))) => {
            let full = encoder.encode_full(raster, parity)?;
            let blocks = encoder.encode_blocks(diff.packed_blocks, changed_count)?;
            let bitmap = diff.bitmap.as_bytes();

            match scheduler.choose(Some(blocks.len()), bitmap.len(), full.len()) {
                FrameTypeTag::Diff => FrameMessage::Diff {
                    bitmap: Bytes::copy_from_slice(bitmap),
                    payload: Bytes::from(blocks),
                },
                _ => FrameMessage::Full {
                    parity,
                    payload: Bytes::from(full),
                },
            }
        }
        _ => FrameMessage::Full {
            parity,
            payload: Bytes::from(encoder.encode_full(raster, parity)?),
        },
    };
    Ok(message)
}

// ── Tests ────────────────────────────────────────────────────────
