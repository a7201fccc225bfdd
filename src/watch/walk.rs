// src/watch/walk.rs

//! Pure traversal of a workspace subtree.
//!
//! The walker never touches the watch backend. It reports which visible
//! directories still need registering and which visible files exist, and the
//! caller applies registration and backfill as a separate step.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::warn;

use crate::fs::{EntryKind, FileSystem};
use crate::types::ChangeEvent;

/// Prefix marking hidden entries on the host filesystem.
pub const HIDDEN_MARKER: char = '.';

/// Returns true if the final component of `path` is hidden.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(HIDDEN_MARKER))
        .unwrap_or(false)
}

/// How [`plan_subtree`] should treat the directory it starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStart {
    /// The workspace root: always visible, whatever its name.
    Root,
    /// A directory below the root: skipped entirely if hidden.
    Descendant,
}

/// Result of walking one subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationPlan {
    /// Visible directories not yet known to the caller, parents first.
    pub directories: Vec<PathBuf>,
    /// Visible files found under the subtree, in walk order.
    pub files: Vec<PathBuf>,
}

impl RegistrationPlan {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    /// Synthetic `Created` events for every file in the plan.
    pub fn backfill_events(&self) -> Vec<ChangeEvent> {
        self.files.iter().cloned().map(ChangeEvent::created).collect()
    }
}

/// Walk the subtree rooted at `start`.
///
/// - Hidden directories are neither reported nor descended into.
/// - Directories in `known` are descended into but not reported again.
/// - Files are only collected when `collect_files` is set.
///
/// A failure to list `start` itself is returned; failures deeper in the tree
/// are logged and that directory's children are skipped.
pub fn plan_subtree(
    fs: &dyn FileSystem,
    start: &Path,
    start_kind: WalkStart,
    known: &HashSet<PathBuf>,
    collect_files: bool,
) -> Result<RegistrationPlan> {
    let mut plan = RegistrationPlan::default();

    if start_kind == WalkStart::Descendant && is_hidden(start) {
        return Ok(plan);
    }

    let mut stack = vec![start.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(err) if dir == start => return Err(err),
            Err(err) => {
                warn!(dir = ?dir, error = %err, "failed to list directory; skipping its subtree");
                continue;
            }
        };
        children.sort();

        if !known.contains(&dir) {
            plan.directories.push(dir.clone());
        }

        let mut subdirs = Vec::new();
        for child in children {
            match fs.kind(&child) {
                Some(EntryKind::Dir) if is_hidden(&child) => {}
                Some(EntryKind::Dir) => subdirs.push(child),
                Some(EntryKind::File) if collect_files => plan.files.push(child),
                // Vanished between listing and inspection, or not collecting.
                _ => {}
            }
        }

        // Reverse so that popping visits children in sorted order.
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(plan)
}
