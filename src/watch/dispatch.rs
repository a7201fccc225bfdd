// src/watch/dispatch.rs

//! The dispatch loop run on the watcher's background thread.
//!
//! One iteration: bounded poll -> classify -> deliver to the sink -> re-arm
//! the directory that produced the batch. The loop exits when the state
//! leaves `Running`, the backend is closed, the root registration becomes
//! invalid, or a native event kind cannot be classified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::types::{ChangeEvent, ChangeKind};
use crate::watch::backend::{NativeEntry, NativeKind, Notification, PollOutcome, WatchBackend};
use crate::watch::registry::Registry;
use crate::watch::sink::ChangeSink;
use crate::watch::state::StateCell;

enum Flow {
    Continue,
    Stop,
}

pub(crate) struct Dispatcher<B: WatchBackend> {
    registry: Registry<B>,
    backend: Arc<B>,
    sink: Box<dyn ChangeSink>,
    state: Arc<StateCell>,
    poll_timeout: Duration,
}

impl<B: WatchBackend> Dispatcher<B> {
    pub fn new(
        registry: Registry<B>,
        backend: Arc<B>,
        sink: Box<dyn ChangeSink>,
        state: Arc<StateCell>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            sink,
            state,
            poll_timeout,
        }
    }

    /// Run until stopped. Always leaves the state `Stopped` and the backend
    /// released; returns the fatal error if one ended the loop.
    pub fn run(mut self) -> Result<()> {
        debug!(root = ?self.registry.root(), "dispatch loop started");

        let result = self.poll_loop();
        if let Err(err) = &result {
            error!(error = %err, "dispatch loop aborted");
        }

        self.state.stop();
        self.backend.close();
        debug!("dispatch loop finished");
        result
    }

    fn poll_loop(&mut self) -> Result<()> {
        while self.state.is_running() {
            match self.backend.poll(self.poll_timeout) {
                Ok(PollOutcome::Idle) => {}
                Ok(PollOutcome::Closed) => {
                    debug!("watch backend closed");
                    break;
                }
                Ok(PollOutcome::Ready(notification)) => {
                    if let Flow::Stop = self.handle(notification)? {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "error while polling for changes; continuing");
                }
            }
        }
        Ok(())
    }

    fn handle(&mut self, notification: Notification) -> Result<Flow> {
        let (dir, entries) = match notification {
            Notification::Overflow => {
                // No rescan: anything lost in this window stays unreported.
                warn!("watch event queue overflowed; some changes were not reported");
                return Ok(Flow::Continue);
            }
            Notification::Entries { dir, entries } => (dir, entries),
        };

        for entry in entries {
            self.handle_entry(&dir, entry)?;
        }

        if self.backend.rearm(&dir) {
            return Ok(Flow::Continue);
        }

        self.registry.forget(&dir);
        debug!(dir = ?dir, "directory has been unregistered");
        if dir == self.registry.root() {
            info!(root = ?dir, "workspace root has been unregistered; stopping watch service");
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }

    fn handle_entry(&mut self, dir: &Path, entry: NativeEntry) -> Result<()> {
        let path = dir.join(&entry.name);

        if self.registry.fs().is_dir(&path) {
            if entry.kind == NativeKind::Modify && self.registry.contains(&path) {
                return Ok(());
            }

            // A directory appeared (or was replaced): watch it and report the
            // files it already holds.
            self.registry.forget(&path);
            match self.registry.register_subtree(&path, true) {
                Ok(backfill) => {
                    for event in backfill {
                        self.deliver(event);
                    }
                }
                Err(err) => {
                    warn!(dir = ?path, error = %err, "failed to watch new directory");
                }
            }
            return Ok(());
        }

        let kind = ChangeKind::try_from(entry.kind)?;
        debug!(path = ?path, %kind, "received event");
        self.deliver(ChangeEvent::new(path, kind));
        Ok(())
    }

    fn deliver(&mut self, event: ChangeEvent) {
        if !self.state.is_running() {
            debug!(%event, "watcher stopped; dropping event");
            return;
        }

        let sink = &mut self.sink;
        if catch_unwind(AssertUnwindSafe(|| sink.deliver(event))).is_err() {
            warn!("change sink panicked; continuing with the next event");
        }
    }
}
