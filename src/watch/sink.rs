// src/watch/sink.rs

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::ChangeEvent;

/// Consumer of classified change events.
///
/// `deliver` runs on the watcher's dispatch thread, one event at a time.
/// Anything slow in here delays every event behind it.
pub trait ChangeSink: Send + 'static {
    fn deliver(&mut self, event: ChangeEvent);
}

impl<F> ChangeSink for F
where
    F: FnMut(ChangeEvent) + Send + 'static,
{
    fn deliver(&mut self, event: ChangeEvent) {
        self(event)
    }
}

/// Forwards events into a Tokio channel, bridging the blocking dispatch
/// thread into async code.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ChangeEvent>) -> Self {
        Self { tx }
    }

    /// Convenience: a sink plus the receiver it feeds.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ChangeSink for ChannelSink {
    fn deliver(&mut self, event: ChangeEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!(event = %err.0, "change receiver dropped; discarding event");
        }
    }
}
