// src/watch/registry.rs

//! The set of directories currently registered with the backend.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::ChangeEvent;
use crate::watch::backend::WatchBackend;
use crate::watch::walk::{plan_subtree, WalkStart};

/// Upper bound on walk/register rounds for one subtree. Each round only
/// happens if the previous one found directories that appeared while it was
/// registering.
const MAX_REGISTRATION_PASSES: usize = 8;

pub(crate) struct Registry<B: WatchBackend> {
    root: PathBuf,
    backend: Arc<B>,
    fs: Arc<dyn FileSystem>,
    registered: HashSet<PathBuf>,
}

impl<B: WatchBackend> Registry<B> {
    pub fn new(root: PathBuf, backend: Arc<B>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root,
            backend,
            fs,
            registered: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        &*self.fs
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.registered.contains(dir)
    }

    pub fn forget(&mut self, dir: &Path) -> bool {
        self.registered.remove(dir)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Register the whole workspace. Failing to register the root is fatal.
    pub fn register_tree(&mut self) -> Result<()> {
        let root = self.root.clone();
        self.register_subtree(&root, false)?;
        Ok(())
    }

    /// Register every visible directory under `start` that is not registered
    /// yet. With `backfill`, returns a `Created` event for every visible file
    /// found once all of them are registered.
    ///
    /// The subtree is re-walked after each round of registrations until a
    /// walk finds nothing new, so entries created while registering are
    /// either reported by the backend or picked up by the final walk.
    pub fn register_subtree(&mut self, start: &Path, backfill: bool) -> Result<Vec<ChangeEvent>> {
        let start_kind = if start == self.root {
            WalkStart::Root
        } else {
            WalkStart::Descendant
        };
        let mut failed: HashSet<PathBuf> = HashSet::new();

        for _ in 0..MAX_REGISTRATION_PASSES {
            let known: HashSet<PathBuf> = self.registered.union(&failed).cloned().collect();
            let plan = plan_subtree(&*self.fs, start, start_kind, &known, backfill)?;

            if plan.directories.is_empty() {
                return Ok(plan.backfill_events());
            }

            for dir in plan.directories {
                match self.backend.register(&dir) {
                    Ok(()) => {
                        self.registered.insert(dir);
                    }
                    Err(err) if dir == self.root => return Err(err),
                    Err(err) => {
                        warn!(dir = ?dir, error = %err, "failed to watch directory");
                        failed.insert(dir);
                    }
                }
            }
        }

        warn!(start = ?start, "directory tree kept changing during registration; giving up");
        let known: HashSet<PathBuf> = self.registered.union(&failed).cloned().collect();
        let plan = plan_subtree(&*self.fs, start, start_kind, &known, backfill)?;
        debug!(unregistered = plan.directories.len(), "final walk after giving up");
        Ok(plan.backfill_events())
    }
}
