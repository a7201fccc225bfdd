//! Shared helpers for treewatch integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing_subscriber::{fmt, EnvFilter};
use treewatch::types::{ChangeEvent, ChangeKind};
use treewatch::watch::ChangeSink;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=treewatch=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .with_thread_names(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Poll `cond` every 10ms until it holds or `timeout` elapses. Returns the
/// last evaluation.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// A sink that records every delivered event. Clones share the recording.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, path: &Path, kind: ChangeKind) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.path == path && e.kind == kind)
    }

    /// Wait until an event for `path` with `kind` was delivered.
    pub fn wait_for(&self, path: &Path, kind: ChangeKind, timeout: Duration) -> bool {
        wait_until(timeout, || self.contains(path, kind))
    }
}

impl ChangeSink for EventRecorder {
    fn deliver(&mut self, event: ChangeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A fresh temporary workspace plus its canonical path.
///
/// The directory name does not start with a dot, so nothing about the root
/// itself is hidden.
pub fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new()
        .prefix("ws")
        .tempdir()
        .expect("creating temporary workspace");
    let root = dir
        .path()
        .canonicalize()
        .expect("canonicalizing temporary workspace");
    (dir, root)
}
