//! Control-record channel from the remote device.
//!
//! Driven by the same tick as the frame channel. Each poll drains what
//! the socket already holds and hands back only the newest complete
//! record; stale input state is worthless once a newer one exists.

use std::net::SocketAddr;

use tracing::{debug, trace};

use crate::config::LinkConfig;
use crate::stream::link::{ConnectionState, Link, LinkPoll};
use crate::stream::record::{ControlRecord, RecordAssembler};

/// Upper bound on bytes drained per poll, so a flooding peer cannot
/// stall the tick.
const MAX_DRAIN_PER_POLL: usize = 64 * 1024;

pub struct InboundRecordChannel {
    link: Link,
    assembler: RecordAssembler,
    scratch: Box<[u8]>,
    records: u64,
}

impl InboundRecordChannel {
    pub fn new(addr: SocketAddr, config: LinkConfig) -> Self {
        Self {
            link: Link::new("inbound", addr, config),
            assembler: RecordAssembler::new(),
            scratch: vec![0u8; 1024].into_boxed_slice(),
            records: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Complete records received so far, superseded ones included.
    pub fn records_received(&self) -> u64 {
        self.records
    }

    /// Keep the link alive and drain pending bytes.
    ///
    /// Returns the most recent record completed during this call. A
    /// partial record stays buffered until a later call completes it.
    pub async fn on_bytes_available(&mut self) -> Option<ControlRecord> {
        match self.link.poll().await {
            LinkPoll::Down => return None,
            LinkPoll::JustConnected => self.assembler.clear(),
            LinkPoll::Up => {}
        }

        let mut latest = None;
        let mut drained = 0;
        while drained < MAX_DRAIN_PER_POLL {
            let n = match self.link.try_read(&mut self.scratch) {
                Ok(Some(n)) => n,
                Ok(None) => break,
                Err(e) => {
                    debug!("inbound read: {e}");
                    self.assembler.clear();
                    break;
                }
            };
            drained += n;

            let before = self.assembler.filled();
            let completed = (before + n) / ControlRecord::SIZE;
            if let Some(record) = self.assembler.feed(&self.scratch[..n]) {
                self.records += completed as u64;
                latest = Some(record);
            }
        }

        if let Some(record) = &latest {
            trace!(buttons = record.pressed_buttons, "control record");
        }
        latest
    }
}

// ── Tests ────────────────────────────────────────────────────────
