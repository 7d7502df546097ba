//! Configuration for the streaming host.

use std::path::Path;

use serde::{Deserialize, Serialize};

use ctroll_core::{DEFAULT_INBOUND_PORT, DEFAULT_OUTBOUND_PORT, EncoderConfig, FramePolicy, LinkConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Where the remote device listens.
    pub network: NetworkConfig,
    /// Connection timeouts and reconnect cooldown.
    pub link: LinkConfig,
    /// Frame source settings.
    pub capture: CaptureConfig,
    /// NoChange / Diff / Full thresholds.
    pub policy: FramePolicy,
    /// Compression quality.
    pub encoder: EncoderConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Peer addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host name or IP of the remote device.
    pub peer: String,
    /// Peer for control records. Empty means the same as `peer`.
    pub inbound_peer: String,
    /// Port receiving frames.
    pub outbound_port: u16,
    /// Port sending control records.
    pub inbound_port: u16,
}

/// Frame source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// Ticks per second; one frame is offered per tick.
    pub fps: u32,
    /// Test pattern advances every this many frames.
    pub pattern_step_frames: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer: "127.0.0.1".into(),
            inbound_peer: String::new(),
            outbound_port: DEFAULT_OUTBOUND_PORT,
            inbound_port: DEFAULT_INBOUND_PORT,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 60,
            pattern_step_frames: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl NetworkConfig {
    /// Host of the control-record peer.
    pub fn inbound_peer(&self) -> &str {
        if self.inbound_peer.is_empty() {
            &self.peer
        } else {
            &self.inbound_peer
        }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────
