//! Domain-specific error types for the ctroll streaming link.
//!
//! Internal operations return `Result<T, StreamError>`. The per-tick
//! channel entry points never surface these to the caller: every failure
//! degrades to "try again next tick" after being logged.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// The canonical error type for the streaming link.
#[derive(Debug, Error)]
pub enum StreamError {
    // ── Connection Errors ────────────────────────────────────────
    /// The peer refused or could not be reached.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Writing to the peer failed; the connection is assumed dead.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// Reading from the peer failed; the connection is assumed dead.
    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// The peer closed its end of the connection.
    #[error("peer closed the connection")]
    PeerClosed,

    /// An operation needed a connection but none is established.
    #[error("not connected")]
    NotConnected,

    // ── Frame Errors ─────────────────────────────────────────────
    /// The image compressor rejected the frame.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// A payload does not fit the 16-bit length prefix.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A raster's buffer does not match its declared geometry.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// Bytes on the wire violated the framing rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Other ────────────────────────────────────────────────────
    /// The I/O layer reported an error outside a read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Whether the error means the underlying connection is unusable.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            StreamError::WriteFailed(_)
                | StreamError::ReadFailed(_)
                | StreamError::PeerClosed
                | StreamError::Timeout(_)
                | StreamError::Io(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for StreamError {
    fn from(s: String) -> Self {
        StreamError::Other(s)
    }
}

impl From<&str> for StreamError {
    fn from(s: &str) -> Self {
        StreamError::Other(s.to_string())
    }
}

impl From<image::ImageError> for StreamError {
    fn from(e: image::ImageError) -> Self {
        StreamError::EncodeFailed(e.to_string())
    }
}
