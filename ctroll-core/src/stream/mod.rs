//! # Frame streaming and control telemetry
//!
//! A host pushes successive RGB frames to a remote viewer over TCP and
//! receives the viewer's control state back over a second connection.
//!
//! ## Architecture
//!
//! ```text
//! HOST                                        REMOTE DEVICE
//! ┌──────────────────────────┐               ┌─────────────────────┐
//! │ Raster                   │               │                     │
//! │   ↓                      │               │                     │
//! │ BlockDiffEngine          │   tcp/6543    │ frame decoder       │
//! │   ↓                      │ ──────────►   │                     │
//! │ FrameScheduler           │               │                     │
//! │   ↓                      │ ◄── 1 byte ── │ confirmation        │
//! │ FrameEncoder/FrameCodec  │               │                     │
//! │                          │   tcp/6542    │                     │
//! │ RecordAssembler ◄────────┼───────────────│ 22-byte records     │
//! └──────────────────────────┘               └─────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module      | Purpose                                            |
//! |-------------|----------------------------------------------------|
//! | `types`     | `Raster` pixel buffer and checkerboard `Parity`    |
//! | `diff`      | 8×8 block change detection and the change bitmap   |
//! | `encoder`   | Checkerboard extraction and lossy compression      |
//! | `protocol`  | Frame tags and the length-prefixed wire codec      |
//! | `scheduler` | NoChange / Diff / Full decision and staleness      |
//! | `link`      | Tick-driven TCP connection with reconnect cooldown |
//! | `outbound`  | Host-side frame channel                            |
//! | `record`    | 22-byte control records and their reassembly       |
//! | `inbound`   | Control-record channel                             |

pub mod diff;
pub mod encoder;
pub mod inbound;
pub mod link;
pub mod outbound;
pub mod protocol;
pub mod record;
pub mod scheduler;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use diff::{BLOCK_BYTES, BLOCK_SIZE, BlockDiffEngine, DiffBitmap, DiffOutcome, DiffResult};
pub use encoder::{FrameCompressor, FrameEncoder, JpegCompressor, checkerboard_half};
pub use inbound::InboundRecordChannel;
pub use link::{ConnectionState, Link, LinkPoll};
pub use outbound::{ChannelStats, OutboundFrameChannel};
pub use protocol::{FrameCodec, FrameMessage, FrameTypeTag, MAX_PAYLOAD_SIZE};
pub use record::{Buttons, ControlRecord, RecordAssembler};
pub use scheduler::{FrameScheduler, Plan};
pub use types::{BYTES_PER_PIXEL, Parity, Raster};
