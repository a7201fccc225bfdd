// src/watch/notify_backend.rs

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use crate::errors::{Result, WatchError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::backend::{PollOutcome, WatchBackend};
use crate::watch::translate::EventTranslator;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`WatchBackend`] built on the platform watcher picked by `notify`.
///
/// Every directory gets its own non-recursive watch, so hidden subtrees are
/// never watched at all. Raw events arrive on a std channel from `notify`'s
/// own thread and are translated lazily, on `poll`.
pub struct NotifyBackend {
    /// `None` once closed. Dropping the watcher ends `notify`'s event thread,
    /// which disconnects `events`.
    watcher: Mutex<Option<RecommendedWatcher>>,
    events: Mutex<Receiver<notify::Result<Event>>>,
    translator: Mutex<EventTranslator>,
    fs: RealFileSystem,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

impl NotifyBackend {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let watcher = RecommendedWatcher::new(tx, Config::default())?;

        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            events: Mutex::new(rx),
            translator: Mutex::new(EventTranslator::new()),
            fs: RealFileSystem,
        })
    }

    fn is_closed(&self) -> bool {
        lock(&self.watcher).is_none()
    }
}

impl WatchBackend for NotifyBackend {
    fn register(&self, dir: &Path) -> Result<()> {
        let mut guard = lock(&self.watcher);
        let watcher = guard.as_mut().ok_or(WatchError::BackendClosed)?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        lock(&self.translator).watch(dir.to_path_buf());
        debug!(dir = ?dir, "registered directory");
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> Result<PollOutcome> {
        if self.is_closed() {
            return Ok(PollOutcome::Closed);
        }

        if let Some(item) = lock(&self.translator).next() {
            return Ok(PollOutcome::Ready(item?));
        }

        let events = lock(&self.events);
        let first = match events.recv_timeout(timeout) {
            Ok(first) => first,
            Err(RecvTimeoutError::Timeout) => return Ok(PollOutcome::Idle),
            Err(RecvTimeoutError::Disconnected) => return Ok(PollOutcome::Closed),
        };

        // Translate the whole burst at once so repeats within it coalesce.
        let mut translator = lock(&self.translator);
        for raw in std::iter::once(first).chain(events.try_iter()) {
            match raw {
                Ok(event) => translator.translate(&event, &self.fs),
                Err(err) => translator.record_error(err),
            }
        }

        match translator.next() {
            Some(item) => Ok(PollOutcome::Ready(item?)),
            None => Ok(PollOutcome::Idle),
        }
    }

    fn rearm(&self, dir: &Path) -> bool {
        let still_dir = self.fs.is_dir(dir);
        {
            let mut translator = lock(&self.translator);
            if still_dir && translator.is_watched(dir) {
                return true;
            }
            translator.forget(dir);
        }

        if let Some(watcher) = lock(&self.watcher).as_mut() {
            // The platform watch is usually gone already.
            if let Err(err) = watcher.unwatch(dir) {
                debug!(dir = ?dir, error = %err, "unwatch after invalidation failed");
            }
        }
        false
    }

    fn close(&self) {
        if lock(&self.watcher).take().is_some() {
            lock(&self.translator).clear();
            debug!("released notify watcher");
        }
    }
}
