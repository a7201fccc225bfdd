#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use treewatch::fs::mock::MockFileSystem;
use treewatch::watch::{ScriptedBackend, WatchOptions, Watcher};

pub use treewatch_test_utils::{init_tracing, wait_until, workspace, EventRecorder};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Generous upper bound for anything that waits on a real OS notification.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Short window used to assert that nothing (more) happens.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// A watcher over `/ws` in `fs`, driven by `backend`, recording into the
/// returned recorder.
pub fn scripted_watcher(
    fs: &MockFileSystem,
    backend: &ScriptedBackend,
) -> (Watcher<ScriptedBackend>, EventRecorder) {
    let recorder = EventRecorder::new();
    let watcher = Watcher::with_backend(
        "/ws",
        recorder.clone(),
        backend.clone(),
        Arc::new(fs.clone()),
        WatchOptions {
            poll_timeout: Duration::from_millis(10),
        },
    );
    (watcher, recorder)
}
