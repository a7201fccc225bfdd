// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::errors::{Result, WatchError};
use crate::fs::{EntryKind, FileSystem, RealFileSystem};
use crate::types::WatcherState;
use crate::watch::backend::WatchBackend;
use crate::watch::dispatch::Dispatcher;
use crate::watch::notify_backend::NotifyBackend;
use crate::watch::registry::Registry;
use crate::watch::sink::ChangeSink;
use crate::watch::state::StateCell;

/// How long a single poll may block before the loop re-checks its state.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(300);

const THREAD_NAME: &str = "filewatch-thread";

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub poll_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Recursive watcher over a workspace directory.
///
/// Construction does nothing observable. [`Watcher::start`] registers every
/// visible directory and spawns the dispatch thread; [`Watcher::stop`] (or
/// dropping the watcher) releases the backend. A watcher is single-shot: it
/// cannot be restarted once stopped.
pub struct Watcher<B: WatchBackend = NotifyBackend> {
    root: PathBuf,
    backend: Arc<B>,
    fs: Arc<dyn FileSystem>,
    /// Handed to the dispatch thread on start.
    sink: Option<Box<dyn ChangeSink>>,
    state: Arc<StateCell>,
    options: WatchOptions,
    thread: Option<JoinHandle<Result<()>>>,
}

impl<B: WatchBackend> std::fmt::Debug for Watcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("root", &self.root)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl Watcher<NotifyBackend> {
    /// Watcher over the real filesystem using the platform backend.
    pub fn new(root: impl Into<PathBuf>, sink: impl ChangeSink) -> Result<Self> {
        Self::with_options(root, sink, WatchOptions::default())
    }

    pub fn with_options(
        root: impl Into<PathBuf>,
        sink: impl ChangeSink,
        options: WatchOptions,
    ) -> Result<Self> {
        Ok(Self::with_backend(
            root,
            sink,
            NotifyBackend::new()?,
            Arc::new(RealFileSystem),
            options,
        ))
    }
}

impl<B: WatchBackend> Watcher<B> {
    pub fn with_backend(
        root: impl Into<PathBuf>,
        sink: impl ChangeSink,
        backend: B,
        fs: Arc<dyn FileSystem>,
        options: WatchOptions,
    ) -> Self {
        Self {
            root: root.into(),
            backend: Arc::new(backend),
            fs,
            sink: Some(Box::new(sink)),
            state: Arc::new(StateCell::new()),
            options,
            thread: None,
        }
    }

    /// The workspace root. Canonical once the watcher has started.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> WatcherState {
        self.state.get()
    }

    /// A cloneable handle that can stop this watcher from another thread.
    pub fn stop_handle(&self) -> StopHandle<B> {
        StopHandle {
            state: Arc::clone(&self.state),
            backend: Arc::clone(&self.backend),
        }
    }

    /// Register the workspace and start the dispatch thread.
    ///
    /// Returns once the initial registration is done, without waiting for
    /// any change. Fails if the root is missing or not a directory, or if the
    /// watcher is not `Idle`.
    pub fn start(&mut self) -> Result<()> {
        let state = self.state.get();
        if state != WatcherState::Idle {
            return Err(WatchError::IllegalState {
                operation: "start",
                state,
            });
        }

        let root = self.resolve_root()?;
        info!(root = ?root, "starting watch service");

        let mut registry = Registry::new(root.clone(), Arc::clone(&self.backend), Arc::clone(&self.fs));
        registry.register_tree()?;
        debug!(directories = registry.len(), "initial registration complete");

        let sink = self.sink.take().ok_or(WatchError::IllegalState {
            operation: "start",
            state,
        })?;
        self.state
            .begin()
            .map_err(|state| WatchError::IllegalState {
                operation: "start",
                state,
            })?;

        let dispatcher = Dispatcher::new(
            registry,
            Arc::clone(&self.backend),
            sink,
            Arc::clone(&self.state),
            self.options.poll_timeout,
        );
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || dispatcher.run());

        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(err) => {
                self.stop();
                return Err(err.into());
            }
        }

        self.root = root;
        Ok(())
    }

    /// Stop watching. Idempotent; does not wait for the dispatch thread.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Wait for the dispatch thread to exit and return its outcome.
    ///
    /// Only returns once the watcher has stopped, either through `stop()`,
    /// root invalidation or a fatal dispatch error.
    pub fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| WatchError::Other(anyhow!("dispatch thread panicked")))?,
            None => Ok(()),
        }
    }

    fn resolve_root(&self) -> Result<PathBuf> {
        let root = self
            .fs
            .canonicalize(&self.root)
            .map_err(|_| WatchError::RootNotFound(self.root.clone()))?;

        match self.fs.kind(&root) {
            Some(EntryKind::Dir) => Ok(root),
            Some(EntryKind::File) => Err(WatchError::NotADirectory(root)),
            None => Err(WatchError::RootNotFound(root)),
        }
    }
}

impl<B: WatchBackend> Drop for Watcher<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Stops a [`Watcher`] from any thread.
pub struct StopHandle<B: WatchBackend> {
    state: Arc<StateCell>,
    backend: Arc<B>,
}

impl<B: WatchBackend> Clone for StopHandle<B> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: WatchBackend> StopHandle<B> {
    /// Move to `Stopped` and release the backend, unblocking any pending
    /// poll. A no-op if already stopped.
    pub fn stop(&self) {
        if self.state.stop() == WatcherState::Stopped {
            return;
        }
        info!("stopping watch service");
        self.backend.close();
    }

    pub fn state(&self) -> WatcherState {
        self.state.get()
    }
}
