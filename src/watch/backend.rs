// src/watch/backend.rs

//! Pluggable OS watch primitive.
//!
//! The dispatch loop talks to a `WatchBackend` instead of `notify` directly.
//! Production code uses [`crate::watch::NotifyBackend`]; tests can use
//! [`crate::watch::ScriptedBackend`] to feed exact notification sequences.
//!
//! A backend must be able to:
//! - register a single directory for entry create/modify/delete notifications
//! - poll for pending notifications with a timeout
//! - signal queue overflow
//! - report whether a registration is still valid
//! - be released, unblocking any pending poll

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, WatchError};
use crate::types::ChangeKind;

/// Event kind as reported by the backend, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeKind {
    Create,
    Modify,
    Delete,
    /// Anything the backend could not map; classifying it is a hard failure.
    Unknown(String),
}

impl TryFrom<NativeKind> for ChangeKind {
    type Error = WatchError;

    fn try_from(kind: NativeKind) -> Result<Self> {
        match kind {
            NativeKind::Create => Ok(ChangeKind::Created),
            NativeKind::Modify => Ok(ChangeKind::Modified),
            NativeKind::Delete => Ok(ChangeKind::Deleted),
            NativeKind::Unknown(name) => Err(WatchError::UnrecognizedEventKind(name)),
        }
    }
}

/// One entry-level event: a child `name` of the batch's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEntry {
    pub name: OsString,
    pub kind: NativeKind,
}

impl NativeEntry {
    pub fn new(name: impl Into<OsString>, kind: NativeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A notification batch handed to the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The backend dropped events because its queue filled up.
    Overflow,
    /// Entry events produced by one watched directory. `entries` may be
    /// empty when the directory only needs re-arming (e.g. it went away).
    Entries {
        dir: PathBuf,
        entries: Vec<NativeEntry>,
    },
}

/// Result of a single bounded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Timed out with nothing to report.
    Idle,
    Ready(Notification),
    /// The backend has been released; no further notifications will come.
    Closed,
}

/// Trait abstracting the OS-level directory watch facility.
///
/// All methods take `&self`: the watcher keeps one handle to release the
/// backend from the caller's thread while the dispatch thread polls it.
pub trait WatchBackend: Send + Sync + 'static {
    /// Watch `dir` (non-recursively) for entry create/modify/delete.
    fn register(&self, dir: &Path) -> Result<()>;

    /// Wait at most `timeout` for the next notification batch.
    ///
    /// `Err` is a transient failure; the caller logs it and polls again.
    fn poll(&self, timeout: Duration) -> Result<PollOutcome>;

    /// Re-arm `dir` after its batch was processed.
    ///
    /// Returns false if the registration is no longer valid (the directory
    /// was removed or unregistered); the backend forgets it in that case.
    fn rearm(&self, dir: &Path) -> bool;

    /// Release the backend. Idempotent.
    fn close(&self);
}
