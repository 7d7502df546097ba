//! # ctroll-core
//!
//! Streaming library for mirroring a host framebuffer onto a remote
//! handheld and reading its controls back.
//!
//! This crate contains:
//! - **Frames**: `Raster`, checkerboard `Parity`, block diffing and the
//!   NoChange / Diff / Full scheduling policy
//! - **Codec**: `FrameCodec` for framed TCP I/O via `tokio_util`
//! - **Channels**: `OutboundFrameChannel` and `InboundRecordChannel`,
//!   each owning a reconnecting `Link`
//! - **Config**: serde-backed `LinkConfig`, `FramePolicy`, `EncoderConfig`
//! - **Error**: `StreamError`, a `thiserror`-based error type

pub mod config;
pub mod error;
pub mod stream;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{DEFAULT_INBOUND_PORT, DEFAULT_OUTBOUND_PORT, EncoderConfig, FramePolicy, LinkConfig};
pub use error::StreamError;
pub use stream::{
    Buttons, ChannelStats, ConnectionState, ControlRecord, FrameCodec, FrameMessage,
    FrameTypeTag, InboundRecordChannel, OutboundFrameChannel, Parity, Raster,
};
