// src/watch/mod.rs

//! Recursive directory watching.
//!
//! This module is responsible for:
//! - Registering every visible directory under the workspace root with a
//!   non-recursive OS watch (`notify`), and new subtrees as they appear.
//! - Translating native notifications into per-directory entry batches.
//! - Running the dispatch loop that classifies entries into
//!   [`ChangeEvent`](crate::types::ChangeEvent)s and hands them to a sink.
//!
//! It does **not** debounce or filter; see [`crate::reload`] for that.

pub mod backend;
pub(crate) mod dispatch;
pub mod notify_backend;
pub(crate) mod registry;
pub mod scripted;
pub mod sink;
pub mod state;
pub mod translate;
pub mod walk;
pub mod watcher;

pub use backend::{NativeEntry, NativeKind, Notification, PollOutcome, WatchBackend};
pub use notify_backend::NotifyBackend;
pub use scripted::ScriptedBackend;
pub use sink::{ChangeSink, ChannelSink};
pub use watcher::{StopHandle, WatchOptions, Watcher, DEFAULT_POLL_TIMEOUT};
