// src/watch/translate.rs

//! Translation of raw `notify` events into per-directory notification batches.
//!
//! `notify` reports one path per event and does not tell us which watch
//! produced it. The translator keeps just enough state (the watched set plus
//! tombstones for directories whose removal was already reported) to turn that
//! stream into the "directory + entry name" batches the dispatch loop expects.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::backend::{NativeEntry, NativeKind, Notification};
use crate::watch::walk::is_hidden;

/// A translated item waiting to be polled.
pub type Pending = std::result::Result<Notification, notify::Error>;

/// How many rename trackers to remember. A `From` half whose `Both` summary
/// never arrives (moved out of the tree) would otherwise stay forever.
const RENAME_TRACKER_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct EventTranslator {
    watched: HashSet<PathBuf>,
    /// Watched directories whose removal has been reported once already.
    retired: HashSet<PathBuf>,
    /// Trackers of rename halves already translated; their `Both` summary is
    /// a repeat.
    renames: VecDeque<usize>,
    pending: VecDeque<Pending>,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, dir: PathBuf) {
        self.retired.remove(&dir);
        self.watched.insert(dir);
    }

    pub fn forget(&mut self, dir: &Path) -> bool {
        self.watched.remove(dir)
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    /// Next translated batch (or backend error), oldest first.
    pub fn next(&mut self) -> Option<Pending> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.watched.clear();
        self.retired.clear();
        self.renames.clear();
    }

    pub fn record_error(&mut self, err: notify::Error) {
        self.pending.push_back(Err(err));
    }

    pub fn translate(&mut self, event: &Event, fs: &dyn FileSystem) {
        if event.need_rescan() {
            self.pending.push_back(Ok(Notification::Overflow));
            return;
        }

        match &event.kind {
            // Access notifications are not entry changes.
            EventKind::Access(_) => {}
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.entry(path, NativeKind::Create);
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
                (RenameMode::From, paths) => {
                    self.remember_rename(event.tracker());
                    for path in paths {
                        self.removed(path);
                    }
                }
                (RenameMode::To, paths) => {
                    self.remember_rename(event.tracker());
                    for path in paths {
                        self.entry(path, NativeKind::Create);
                    }
                }
                (RenameMode::Both, _) if self.take_rename(event.tracker()) => {
                    debug!(paths = ?event.paths, "rename already reported by its halves");
                }
                (RenameMode::Both, [from, to]) => {
                    self.removed(from);
                    self.entry(to, NativeKind::Create);
                }
                (_, paths) => {
                    for path in paths {
                        if fs.exists(path) {
                            self.entry(path, NativeKind::Create);
                        } else {
                            self.removed(path);
                        }
                    }
                }
            },
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.entry(path, NativeKind::Modify);
                }
            }
            EventKind::Remove(kind) => {
                for path in &event.paths {
                    // Hidden directories are never watched; their removal is
                    // not reported either.
                    if *kind == RemoveKind::Folder && is_hidden(path) {
                        debug!(?path, "ignoring removal of a hidden directory");
                        continue;
                    }
                    self.removed(path);
                }
            }
            EventKind::Any | EventKind::Other => {
                if event.paths.is_empty() {
                    warn!(kind = ?event.kind, "dropping pathless event of unknown kind");
                }
                for path in &event.paths {
                    self.entry(path, NativeKind::Unknown(format!("{:?}", event.kind)));
                }
            }
        }
    }

    fn remember_rename(&mut self, tracker: Option<usize>) {
        let Some(tracker) = tracker else {
            return;
        };
        if self.renames.contains(&tracker) {
            return;
        }
        if self.renames.len() == RENAME_TRACKER_CAPACITY {
            self.renames.pop_front();
        }
        self.renames.push_back(tracker);
    }

    /// Whether a rename with this tracker was already seen, forgetting it.
    fn take_rename(&mut self, tracker: Option<usize>) -> bool {
        let Some(tracker) = tracker else {
            return false;
        };
        match self.renames.iter().position(|t| *t == tracker) {
            Some(index) => {
                self.renames.remove(index);
                true
            }
            None => false,
        }
    }

    /// A path disappeared (removed or renamed away).
    fn removed(&mut self, path: &Path) {
        if self.retired.remove(path) {
            debug!(?path, "dropping duplicate removal of a watched directory");
            return;
        }

        if self.watched.remove(path) {
            // The directory's own registration is gone. Report it once as an
            // entry of its parent, and hand the loop an empty batch for the
            // directory itself so it notices the invalid registration.
            self.retired.insert(path.to_path_buf());
            if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
                if self.watched.contains(parent) {
                    self.push_entry(parent, NativeEntry::new(name, NativeKind::Delete));
                }
            }
            self.batch_for(path);
            return;
        }

        self.entry(path, NativeKind::Delete);
    }

    fn entry(&mut self, path: &Path, kind: NativeKind) {
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };

        if kind == NativeKind::Create {
            self.retired.remove(path);
        }

        let unknown = matches!(kind, NativeKind::Unknown(_));
        if !unknown && !self.watched.contains(dir) {
            // Self events on a watched directory whose parent is not watched
            // (e.g. the workspace root), or stragglers from a released watch.
            debug!(?path, "ignoring event outside watched directories");
            return;
        }

        self.push_entry(dir, NativeEntry::new(name, kind));
    }

    /// Append to the pending batch for `dir`, coalescing an immediate repeat.
    fn push_entry(&mut self, dir: &Path, entry: NativeEntry) {
        let entries = self.batch_for(dir);
        if entries.last() != Some(&entry) {
            entries.push(entry);
        }
    }

    fn batch_for(&mut self, dir: &Path) -> &mut Vec<NativeEntry> {
        let existing = self.pending.iter().position(|item| {
            matches!(item, Ok(Notification::Entries { dir: d, .. }) if d == dir)
        });

        let index = match existing {
            Some(index) => index,
            None => {
                self.pending.push_back(Ok(Notification::Entries {
                    dir: dir.to_path_buf(),
                    entries: Vec::new(),
                }));
                self.pending.len() - 1
            }
        };

        match &mut self.pending[index] {
            Ok(Notification::Entries { entries, .. }) => entries,
            _ => unreachable!("index always points at an entry batch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use notify::event::{AccessKind, CreateKind, DataChange, Flag, RemoveKind};

    fn translator() -> EventTranslator {
        let mut t = EventTranslator::new();
        t.watch(PathBuf::from("/ws"));
        t.watch(PathBuf::from("/ws/d"));
        t
    }

    fn drain(t: &mut EventTranslator) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Some(item) = t.next() {
            out.push(item.unwrap());
        }
        out
    }

    fn batch(dir: &str, entries: &[(&str, NativeKind)]) -> Notification {
        Notification::Entries {
            dir: PathBuf::from(dir),
            entries: entries
                .iter()
                .map(|(name, kind)| NativeEntry::new(*name, kind.clone()))
                .collect(),
        }
    }

    #[test]
    fn create_then_repeated_modify_is_coalesced_per_directory() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Create(CreateKind::File)).add_path("/ws/a.txt".into()), &fs);
        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
            .add_path("/ws/a.txt".into());
        t.translate(&modify, &fs);
        t.translate(&modify, &fs);
        t.translate(&Event::new(EventKind::Create(CreateKind::File)).add_path("/ws/d/b.txt".into()), &fs);

        assert_eq!(
            drain(&mut t),
            vec![
                batch("/ws", &[("a.txt", NativeKind::Create), ("a.txt", NativeKind::Modify)]),
                batch("/ws/d", &[("b.txt", NativeKind::Create)]),
            ]
        );
    }

    #[test]
    fn access_events_are_ignored_and_rescan_is_overflow() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Access(AccessKind::Any)).add_path("/ws/a.txt".into()), &fs);
        t.translate(&Event::new(EventKind::Other).set_flag(Flag::Rescan), &fs);

        assert_eq!(drain(&mut t), vec![Notification::Overflow]);
    }

    #[test]
    fn removing_a_watched_directory_reports_it_once() {
        let fs = MockFileSystem::new();
        let mut t = translator();
        let self_event = Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("/ws/d".into());

        // Once from the directory's own watch, once from the parent's.
        t.translate(&self_event, &fs);
        t.translate(&self_event, &fs);

        assert_eq!(
            drain(&mut t),
            vec![
                batch("/ws", &[("d", NativeKind::Delete)]),
                batch("/ws/d", &[]),
            ]
        );
        assert!(!t.is_watched(Path::new("/ws/d")));
    }

    #[test]
    fn removing_the_root_only_invalidates_it() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("/ws".into()), &fs);

        assert_eq!(drain(&mut t), vec![batch("/ws", &[])]);
    }

    fn rename(mode: RenameMode, paths: &[&str], tracker: Option<usize>) -> Event {
        let mut event = Event::new(EventKind::Modify(ModifyKind::Name(mode)));
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        match tracker {
            Some(tracker) => event.set_tracker(tracker),
            None => event,
        }
    }

    #[test]
    fn rename_halves_and_their_summary_are_reported_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/new.txt");
        let mut t = translator();

        // inotify: From, To, then a Both summary carrying the same cookie.
        t.translate(&rename(RenameMode::From, &["/ws/old.txt"], Some(7)), &fs);
        t.translate(&rename(RenameMode::To, &["/ws/new.txt"], Some(7)), &fs);
        t.translate(&rename(RenameMode::Both, &["/ws/old.txt", "/ws/new.txt"], Some(7)), &fs);

        assert_eq!(
            drain(&mut t),
            vec![batch("/ws", &[("old.txt", NativeKind::Delete), ("new.txt", NativeKind::Create)])]
        );

        // The tracker is consumed; a later rename reusing it is reported again.
        t.translate(&rename(RenameMode::Both, &["/ws/new.txt", "/ws/d/new.txt"], Some(7)), &fs);
        assert_eq!(
            drain(&mut t),
            vec![
                batch("/ws", &[("new.txt", NativeKind::Delete)]),
                batch("/ws/d", &[("new.txt", NativeKind::Create)]),
            ]
        );
    }

    #[test]
    fn renaming_a_watched_directory_reports_one_delete_and_one_create() {
        let fs = MockFileSystem::new();
        fs.add_dir("/ws/e");
        let mut t = translator();

        t.translate(&rename(RenameMode::From, &["/ws/d"], Some(3)), &fs);
        t.translate(&rename(RenameMode::To, &["/ws/e"], Some(3)), &fs);
        t.translate(&rename(RenameMode::Both, &["/ws/d", "/ws/e"], Some(3)), &fs);

        assert_eq!(
            drain(&mut t),
            vec![
                batch("/ws", &[("d", NativeKind::Delete), ("e", NativeKind::Create)]),
                batch("/ws/d", &[]),
            ]
        );
    }

    #[test]
    fn untracked_renames_split_into_delete_and_create() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/new.txt");
        let mut t = translator();

        t.translate(&rename(RenameMode::Both, &["/ws/old.txt", "/ws/d/moved.txt"], None), &fs);
        let ambiguous = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path("/ws/new.txt".into());
        t.translate(&ambiguous, &fs);

        assert_eq!(
            drain(&mut t),
            vec![
                batch("/ws", &[("old.txt", NativeKind::Delete), ("new.txt", NativeKind::Create)]),
                batch("/ws/d", &[("moved.txt", NativeKind::Create)]),
            ]
        );
    }

    #[test]
    fn unknown_kinds_are_passed_through_for_classification() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Other).add_path("/ws/x".into()), &fs);

        assert_eq!(
            drain(&mut t),
            vec![batch("/ws", &[("x", NativeKind::Unknown("Other".into()))])]
        );
    }

    #[test]
    fn removing_a_hidden_directory_is_silent() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Remove(RemoveKind::Folder)).add_path("/ws/.cache".into()), &fs);
        t.translate(&Event::new(EventKind::Remove(RemoveKind::File)).add_path("/ws/.env".into()), &fs);

        assert_eq!(drain(&mut t), vec![batch("/ws", &[(".env", NativeKind::Delete)])]);
    }

    #[test]
    fn events_from_unwatched_directories_are_dropped() {
        let fs = MockFileSystem::new();
        let mut t = translator();

        t.translate(&Event::new(EventKind::Create(CreateKind::File)).add_path("/elsewhere/a".into()), &fs);
        // A metadata self event on the root has an unwatched parent.
        t.translate(
            &Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/ws".into()),
            &fs,
        );

        assert!(drain(&mut t).is_empty());
    }
}
