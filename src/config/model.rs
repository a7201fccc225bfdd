// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::reload::DEFAULT_DEBOUNCE;
use crate::watch::DEFAULT_POLL_TIMEOUT;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// root = "."
/// poll_timeout_ms = 300
///
/// [reload]
/// debounce_ms = 10
/// include = ["build/classes/**"]
/// skip_deleted = true
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unchecked form; it becomes a [`ConfigFile`] through `TryFrom`, which
/// validates it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub reload: ReloadSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Workspace root. Relative paths are resolved against the current
    /// working directory; the CLI's positional `ROOT` wins over this.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Upper bound on a single backend poll, in milliseconds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT.as_millis() as u64
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: None,
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

/// `[reload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadSection {
    /// Quiet period before a burst of changes is reported.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Root-relative globs; only matching paths trigger a reload. Empty
    /// means everything.
    #[serde(default)]
    pub include: Vec<String>,

    /// Ignore deletions when deciding whether to reload.
    #[serde(default)]
    pub skip_deleted: bool,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for ReloadSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            include: Vec::new(),
            skip_deleted: false,
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub reload: ReloadSection,
}

impl ConfigFile {
    /// Build without validation. Only `TryFrom<RawConfigFile>` and callers
    /// that have already checked the values should use this.
    pub(crate) fn new_unchecked(watch: WatchSection, reload: ReloadSection) -> Self {
        Self { watch, reload }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.watch.poll_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.reload.debounce_ms)
    }
}
