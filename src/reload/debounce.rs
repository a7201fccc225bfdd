// src/reload/debounce.rs

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::reload::updates::PathUpdates;
use crate::types::{ChangeEvent, ChangeKind};

/// Default quiet period before a burst of changes is flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

/// Aggregates change events into [`PathUpdates`] and hands them to a callback
/// once no new event arrived for `timeout`.
///
/// The flush loop runs as a Tokio task; [`Debouncer::spawn`] must be called
/// from inside a runtime. Dropping the debouncer ends the task after flushing
/// whatever is still pending; [`Debouncer::finish`] does the same and waits
/// for it.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    task: JoinHandle<()>,
}

impl Debouncer {
    pub fn spawn<F>(timeout: Duration, callback: F) -> Self
    where
        F: FnMut(PathUpdates) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(flush_loop(timeout, rx, callback));
        Self { tx, task }
    }

    /// Fold a change into the current burst and restart the quiet period.
    pub fn submit(&self, path: impl Into<PathBuf>, kind: ChangeKind) {
        self.submit_event(ChangeEvent::new(path, kind));
    }

    pub fn submit_event(&self, event: ChangeEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!(event = %err.0, "debouncer task has ended; discarding event");
        }
    }

    /// Flush anything pending and wait for the flush loop to exit.
    pub async fn finish(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(err) = task.await {
            debug!(error = %err, "debouncer task did not finish cleanly");
        }
    }
}

async fn flush_loop<F>(window: Duration, mut rx: mpsc::UnboundedReceiver<ChangeEvent>, mut callback: F)
where
    F: FnMut(PathUpdates),
{
    let mut pending = PathUpdates::new();

    loop {
        let msg = if pending.is_empty() {
            rx.recv().await
        } else {
            match timeout(window, rx.recv()).await {
                Ok(msg) => msg,
                Err(_) => {
                    flush(&mut pending, &mut callback);
                    continue;
                }
            }
        };

        match msg {
            Some(event) => {
                trace!(%event, "debouncing change");
                pending.record(event.path, event.kind);
            }
            None => {
                if !pending.is_empty() {
                    flush(&mut pending, &mut callback);
                }
                break;
            }
        }
    }
}

fn flush<F>(pending: &mut PathUpdates, callback: &mut F)
where
    F: FnMut(PathUpdates),
{
    let updates = std::mem::take(pending);
    debug!(changes = updates.len(), "flushing debounced changes");
    callback(updates);
}
