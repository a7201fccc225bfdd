// src/reload/updates.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::{ChangeEvent, ChangeKind};

/// Net effect of a burst of change events, one set per kind.
///
/// The three sets are always disjoint. Later events override earlier ones for
/// the same path, except that a `Modified` after `Created` keeps the path in
/// `created` (a file created during the burst is still new to the consumer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathUpdates {
    created: BTreeSet<PathBuf>,
    modified: BTreeSet<PathBuf>,
    deleted: BTreeSet<PathBuf>,
}

impl PathUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> &BTreeSet<PathBuf> {
        &self.created
    }

    pub fn modified(&self) -> &BTreeSet<PathBuf> {
        &self.modified
    }

    pub fn deleted(&self) -> &BTreeSet<PathBuf> {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len() + self.deleted.len()
    }

    pub fn with_created(mut self, path: impl Into<PathBuf>) -> Self {
        self.record(path, ChangeKind::Created);
        self
    }

    pub fn with_modified(mut self, path: impl Into<PathBuf>) -> Self {
        self.record(path, ChangeKind::Modified);
        self
    }

    pub fn with_deleted(mut self, path: impl Into<PathBuf>) -> Self {
        self.record(path, ChangeKind::Deleted);
        self
    }

    pub fn with_update(mut self, path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        self.record(path, kind);
        self
    }

    /// Fold one change into the aggregate in place.
    pub fn record(&mut self, path: impl Into<PathBuf>, kind: ChangeKind) {
        let path = path.into();
        match kind {
            ChangeKind::Created => {
                self.modified.remove(&path);
                self.deleted.remove(&path);
                self.created.insert(path);
            }
            ChangeKind::Modified => {
                if self.created.contains(&path) {
                    return;
                }
                self.deleted.remove(&path);
                self.modified.insert(path);
            }
            ChangeKind::Deleted => {
                self.created.remove(&path);
                self.modified.remove(&path);
                self.deleted.insert(path);
            }
        }
    }

    /// Current net kind recorded for `path`, if any.
    pub fn kind_of(&self, path: &Path) -> Option<ChangeKind> {
        if self.created.contains(path) {
            Some(ChangeKind::Created)
        } else if self.modified.contains(path) {
            Some(ChangeKind::Modified)
        } else if self.deleted.contains(path) {
            Some(ChangeKind::Deleted)
        } else {
            None
        }
    }
}

impl Extend<ChangeEvent> for PathUpdates {
    fn extend<I: IntoIterator<Item = ChangeEvent>>(&mut self, iter: I) {
        for event in iter {
            self.record(event.path, event.kind);
        }
    }
}

impl FromIterator<ChangeEvent> for PathUpdates {
    fn from_iter<I: IntoIterator<Item = ChangeEvent>>(iter: I) -> Self {
        let mut updates = Self::new();
        updates.extend(iter);
        updates
    }
}
