//! Consumers of control records received from the remote device.

use ctroll_core::ControlRecord;
use tracing::info;

/// Receives the newest control record each tick one arrives.
pub trait ControlSink {
    fn publish(&mut self, record: ControlRecord);
}

/// Logs each distinct control state.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<ControlRecord>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&ControlRecord> {
        self.last.as_ref()
    }
}

impl ControlSink for LogSink {
    fn publish(&mut self, record: ControlRecord) {
        if self.last == Some(record) {
            return;
        }
        info!(
            buttons = ?record.buttons(),
            pad = ?(record.circle_pad_x, record.circle_pad_y),
            touch = ?(record.touch_x, record.touch_y),
            "controls"
        );
        self.last = Some(record);
    }
}

impl ControlSink for Vec<ControlRecord> {
    fn publish(&mut self, record: ControlRecord) {
        self.push(record);
    }
}
