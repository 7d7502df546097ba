//! Host tick loop.
//!
//! Drives both channels from one fixed-rate tick: offer the current frame
//! to the outbound channel, then drain the inbound channel and publish
//! the newest control record.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use ctroll_core::{ChannelStats, InboundRecordChannel, OutboundFrameChannel};

use crate::config::HostConfig;
use crate::sink::ControlSink;
use crate::source::FrameSource;

// ── HostService ──────────────────────────────────────────────────

/// Owns the configuration and the stop flag of one streaming host.
pub struct HostService {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl HostService {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until stopped, or for `ticks` ticks when given.
    ///
    /// Connection problems never end the loop; both channels keep
    /// retrying on their own cooldown.
    pub async fn run<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        ticks: Option<u64>,
    ) -> Result<ChannelStats, Box<dyn std::error::Error>>
    where
        S: FrameSource,
        K: ControlSink,
    {
        let (outbound_addr, inbound_addr) = self.resolve_peers().await?;
        info!("streaming frames to {outbound_addr}, controls from {inbound_addr}");

        let mut outbound = OutboundFrameChannel::new(
            outbound_addr,
            self.config.link.clone(),
            self.config.policy.clone(),
            self.config.encoder.clone(),
        );
        let mut inbound = InboundRecordChannel::new(inbound_addr, self.config.link.clone());

        let period = Duration::from_secs(1) / self.config.capture.fps.max(1);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.running.store(true, Ordering::SeqCst);
        let mut tick = 0u64;
        while self.running.load(Ordering::SeqCst) {
            if ticks.is_some_and(|limit| tick >= limit) {
                break;
            }
            interval.tick().await;
            tick += 1;

            let confirmation = match source.next_frame() {
                Some(raster) => outbound.push_frame(raster).await,
                None => outbound.poll_confirmation().await,
            };
            if confirmation != 0 {
                debug!(confirmation, "peer confirmed");
            }

            if let Some(record) = inbound.on_bytes_available().await {
                sink.publish(record);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        let stats = outbound.stats().clone();
        info!(
            ticks = tick,
            full = stats.full_frames,
            diff = stats.diff_frames,
            no_change = stats.no_change_frames,
            dropped = stats.dropped_frames,
            bytes = stats.bytes_sent,
            records = inbound.records_received(),
            "host stopped"
        );
        Ok(stats)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn resolve_peers(&self) -> std::io::Result<(SocketAddr, SocketAddr)> {
        let net = &self.config.network;
        let outbound = resolve(&net.peer, net.outbound_port).await?;
        let inbound = resolve(net.inbound_peer(), net.inbound_port).await?;
        Ok((outbound, inbound))
    }
}

async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| std::io::Error::other(format!("{host} did not resolve")))
}

// ── Tests ────────────────────────────────────────────────────────
