//! Tunables for the streaming channels.
//!
//! Every threshold here was tuned empirically against a 320×240 surface;
//! they are exposed so hosts can override them from their TOML config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default TCP port for the outbound frame stream.
pub const DEFAULT_OUTBOUND_PORT: u16 = 6543;
/// Default TCP port for the inbound control-record stream.
pub const DEFAULT_INBOUND_PORT: u16 = 6542;

// ── LinkConfig ───────────────────────────────────────────────────

/// Connection lifecycle settings shared by both channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Upper bound on a single connect attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Upper bound on flushing one message to the peer, in milliseconds.
    pub write_timeout_ms: u64,
    /// Ticks to wait after a failed connect before trying again.
    pub retry_ticks: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1000,
            write_timeout_ms: 1000,
            retry_ticks: 300,
        }
    }
}

impl LinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

// ── FramePolicy ──────────────────────────────────────────────────

/// Knobs for the NoChange / Diff / Full decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramePolicy {
    /// Once the staleness counter exceeds this, the next frame is full.
    pub staleness_limit: u32,
    /// A diff touching more than `total_blocks / max_diff_divisor`
    /// blocks is sent as a full frame instead.
    pub max_diff_divisor: u32,
    /// Staleness added by a NoChange message.
    pub no_change_cost: u32,
    /// Staleness added by a Diff message.
    pub diff_cost: u32,
    /// Per-block sum of absolute differences above which a block counts
    /// as changed.
    pub block_threshold: u32,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self {
            staleness_limit: 100,
            max_diff_divisor: 3,
            no_change_cost: 2,
            diff_cost: 5,
            block_threshold: 8 * 8 * 3,
        }
    }
}

// ── EncoderConfig ────────────────────────────────────────────────

/// Compression quality (1..=100) per payload kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Quality for checkerboard full-frame halves.
    pub full_quality: u8,
    /// Quality for packed diff blocks.
    pub diff_quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            full_quality: 70,
            diff_quality: 70,
        }
    }
}
