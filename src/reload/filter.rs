// src/reload/filter.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::types::{ChangeEvent, ChangeKind};

/// Decides which change events are worth a reload.
///
/// Include patterns are matched against the path relative to the workspace
/// root, with forward slashes (e.g. `"build/classes/App.class"`). With no
/// patterns every path is included.
#[derive(Clone)]
pub struct ReloadFilter {
    root: PathBuf,
    include: Option<GlobSet>,
    skip_deleted: bool,
}

impl fmt::Debug for ReloadFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadFilter")
            .field("root", &self.root)
            .field("include", &self.include.as_ref().map(GlobSet::len))
            .field("skip_deleted", &self.skip_deleted)
            .finish()
    }
}

impl ReloadFilter {
    pub fn new(root: impl Into<PathBuf>, include: &[String], skip_deleted: bool) -> Result<Self> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_globset(include).context("building reload include globset")?)
        };

        Ok(Self {
            root: root.into(),
            include,
            skip_deleted,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        if self.skip_deleted && event.kind == ChangeKind::Deleted {
            return false;
        }
        match &self.include {
            None => true,
            Some(set) => set.is_match(relative_str(&self.root, &event.path)),
        }
    }
}

/// `path` relative to `root` with forward slashes. Paths outside the root are
/// returned unchanged.
fn relative_str(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Build a GlobSet from simple string patterns.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_patterns_accepts_everything() {
        let filter = ReloadFilter::new("/ws", &[], false).unwrap();
        assert!(filter.accepts(&ChangeEvent::created("/ws/any/file.txt")));
        assert!(filter.accepts(&ChangeEvent::deleted("/ws/gone")));
    }

    #[test]
    fn include_patterns_match_root_relative_paths() {
        let filter = ReloadFilter::new("/ws", &patterns(&["build/classes/**"]), false).unwrap();

        assert!(filter.accepts(&ChangeEvent::modified("/ws/build/classes/App.class")));
        assert!(filter.accepts(&ChangeEvent::created("/ws/build/classes/a/b/C.class")));
        assert!(!filter.accepts(&ChangeEvent::modified("/ws/src/App.java")));
    }

    #[test]
    fn skip_deleted_drops_deletions_only() {
        let filter = ReloadFilter::new("/ws", &[], true).unwrap();
        assert!(!filter.accepts(&ChangeEvent::deleted("/ws/a")));
        assert!(filter.accepts(&ChangeEvent::created("/ws/a")));
        assert!(filter.accepts(&ChangeEvent::modified("/ws/a")));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        let err = ReloadFilter::new("/ws", &patterns(&["src/[oops"]), false).unwrap_err();
        assert!(format!("{err:#}").contains("invalid glob pattern"));
    }
}
