// src/watch/scripted.rs

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::{Result, WatchError};
use crate::watch::backend::{NativeEntry, Notification, PollOutcome, WatchBackend};

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Result<Notification>>,
    registered: Vec<PathBuf>,
    invalid: HashSet<PathBuf>,
    refused: HashSet<PathBuf>,
    closed: bool,
}

/// Deterministic in-memory [`WatchBackend`].
///
/// Tests push the exact notifications the dispatch loop should see and inspect
/// what got registered. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<(Mutex<Script>, Condvar)>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, item: Result<Notification>) {
        self.lock().queue.push_back(item);
        self.script.1.notify_all();
    }

    pub fn push(&self, notification: Notification) {
        self.enqueue(Ok(notification));
    }

    /// Queue an entry batch for `dir`.
    pub fn push_entries(&self, dir: impl Into<PathBuf>, entries: Vec<NativeEntry>) {
        self.push(Notification::Entries {
            dir: dir.into(),
            entries,
        });
    }

    /// Queue a transient poll failure.
    pub fn push_error(&self, message: impl Into<String>) {
        let message: String = message.into();
        self.enqueue(Err(WatchError::Other(anyhow::anyhow!(message))));
    }

    /// Make the next `rearm` of `dir` fail.
    pub fn invalidate(&self, dir: impl Into<PathBuf>) {
        self.lock().invalid.insert(dir.into());
    }

    /// Make `register(dir)` fail.
    pub fn refuse(&self, dir: impl Into<PathBuf>) {
        self.lock().refused.insert(dir.into());
    }

    /// Directories registered so far, in registration order.
    pub fn registered(&self) -> Vec<PathBuf> {
        self.lock().registered.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of notifications not yet polled.
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }
}

impl WatchBackend for ScriptedBackend {
    fn register(&self, dir: &Path) -> Result<()> {
        let mut script = self.lock();
        if script.closed {
            return Err(WatchError::BackendClosed);
        }
        if script.refused.contains(dir) {
            return Err(WatchError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("refusing to watch {}", dir.display()),
            )));
        }
        script.invalid.remove(dir);
        script.registered.push(dir.to_path_buf());
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> Result<PollOutcome> {
        let guard = self.lock();
        let (mut script, _) = self
            .script
            .1
            .wait_timeout_while(guard, timeout, |s| !s.closed && s.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        if script.closed {
            return Ok(PollOutcome::Closed);
        }
        match script.queue.pop_front() {
            Some(item) => item.map(PollOutcome::Ready),
            None => Ok(PollOutcome::Idle),
        }
    }

    fn rearm(&self, dir: &Path) -> bool {
        let mut script = self.lock();
        !script.invalid.remove(dir) && !script.closed
    }

    fn close(&self) {
        self.lock().closed = true;
        self.script.1.notify_all();
    }
}
