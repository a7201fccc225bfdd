mod common;
use crate::common::{init_tracing, wait_until, workspace, EventRecorder, TestResult, EVENT_TIMEOUT, QUIET_PERIOD};

use std::fs;
use std::io::Write;

use treewatch::types::{ChangeEvent, ChangeKind, WatcherState};
use treewatch::watch::Watcher;
use treewatch::WatchError;

fn started(root: &std::path::Path) -> Result<(Watcher, EventRecorder), WatchError> {
    let recorder = EventRecorder::new();
    let mut watcher = Watcher::new(root, recorder.clone())?;
    watcher.start()?;
    Ok((watcher, recorder))
}

#[test]
fn reports_created_file_in_root() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let (mut watcher, recorder) = started(&root)?;
    assert_eq!(watcher.state(), WatcherState::Running);
    assert_eq!(watcher.root(), root.as_path());

    let file = root.join("a.txt");
    fs::write(&file, "hello")?;

    assert!(recorder.wait_for(&file, ChangeKind::Created, EVENT_TIMEOUT));

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn reports_created_file_in_existing_subdirectory() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    fs::create_dir_all(root.join("src/nested"))?;
    let (mut watcher, recorder) = started(&root)?;

    let file = root.join("src/nested/lib.rs");
    fs::write(&file, "pub fn f() {}")?;

    assert!(recorder.wait_for(&file, ChangeKind::Created, EVENT_TIMEOUT));

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn modifying_a_file_reports_exactly_one_modified() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let file = root.join("existing.txt");
    fs::write(&file, "v1")?;
    let (mut watcher, recorder) = started(&root)?;

    let mut handle = fs::OpenOptions::new().append(true).open(&file)?;
    handle.write_all(b" v2")?;
    handle.sync_all()?;
    drop(handle);
    assert!(recorder.wait_for(&file, ChangeKind::Modified, EVENT_TIMEOUT));
    std::thread::sleep(QUIET_PERIOD);

    assert_eq!(recorder.events(), vec![ChangeEvent::modified(&file)]);

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn deleting_a_file_reports_exactly_one_deleted() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let file = root.join("existing.txt");
    fs::write(&file, "v1")?;
    let (mut watcher, recorder) = started(&root)?;

    fs::remove_file(&file)?;
    assert!(recorder.wait_for(&file, ChangeKind::Deleted, EVENT_TIMEOUT));
    std::thread::sleep(QUIET_PERIOD);

    assert_eq!(recorder.events(), vec![ChangeEvent::deleted(&file)]);

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn renaming_a_file_reports_one_delete_and_one_create() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let old = root.join("old.txt");
    let new = root.join("new.txt");
    fs::write(&old, "v1")?;
    let (mut watcher, recorder) = started(&root)?;

    fs::rename(&old, &new)?;
    assert!(recorder.wait_for(&new, ChangeKind::Created, EVENT_TIMEOUT));
    std::thread::sleep(QUIET_PERIOD);

    assert_eq!(
        recorder.events(),
        vec![ChangeEvent::deleted(&old), ChangeEvent::created(&new)]
    );

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn renaming_a_directory_is_reported_once_and_followed() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    fs::create_dir_all(root.join("a"))?;
    fs::write(root.join("a/inner.txt"), "x")?;
    let (mut watcher, recorder) = started(&root)?;

    fs::rename(root.join("a"), root.join("b"))?;
    let moved = root.join("b/inner.txt");
    assert!(recorder.wait_for(&moved, ChangeKind::Created, EVENT_TIMEOUT));
    std::thread::sleep(QUIET_PERIOD);

    assert_eq!(
        recorder.events(),
        vec![ChangeEvent::deleted(root.join("a")), ChangeEvent::created(&moved)]
    );

    // The renamed directory is watched under its new name.
    let later = root.join("b/later.txt");
    fs::write(&later, "y")?;
    assert!(recorder.wait_for(&later, ChangeKind::Created, EVENT_TIMEOUT));

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn follows_newly_created_directories() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let (mut watcher, recorder) = started(&root)?;

    // Written immediately after creation: reported either by the new watch
    // or by the backfill of the registration walk.
    fs::create_dir_all(root.join("x/y/z"))?;
    let early = root.join("x/y/z/early.txt");
    fs::write(&early, "1")?;
    assert!(recorder.wait_for(&early, ChangeKind::Created, EVENT_TIMEOUT));

    let late = root.join("x/y/z/late.txt");
    fs::write(&late, "2")?;
    assert!(recorder.wait_for(&late, ChangeKind::Created, EVENT_TIMEOUT));

    // Directories themselves are not reported as created.
    assert!(!recorder.contains(&root.join("x"), ChangeKind::Created));

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn ignores_hidden_subtrees() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    fs::create_dir_all(root.join(".hidden/deeper"))?;
    let (mut watcher, recorder) = started(&root)?;

    fs::write(root.join(".hidden/secret.txt"), "s")?;
    fs::write(root.join(".hidden/deeper/secret.txt"), "s")?;
    fs::create_dir_all(root.join("visible/.cache"))?;
    fs::write(root.join("visible/.cache/blob"), "b")?;

    let sentinel = root.join("visible/sentinel.txt");
    fs::write(&sentinel, "v")?;
    assert!(recorder.wait_for(&sentinel, ChangeKind::Created, EVENT_TIMEOUT));
    std::thread::sleep(QUIET_PERIOD);

    let leaked: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.path.starts_with(root.join(".hidden")) || e.path.starts_with(root.join("visible/.cache")))
        .collect();
    assert!(leaked.is_empty(), "hidden paths reported: {leaked:?}");

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn reports_deleted_directory() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    fs::create_dir_all(root.join("sub/gone"))?;
    fs::write(root.join("sub/gone/file.txt"), "x")?;
    let (mut watcher, recorder) = started(&root)?;

    fs::remove_dir_all(root.join("sub/gone"))?;

    assert!(recorder.wait_for(&root.join("sub/gone"), ChangeKind::Deleted, EVENT_TIMEOUT));
    let deletions = recorder
        .events()
        .into_iter()
        .filter(|e| e.path == root.join("sub/gone") && e.kind == ChangeKind::Deleted)
        .count();
    assert_eq!(deletions, 1);
    assert_eq!(watcher.state(), WatcherState::Running);

    watcher.stop();
    watcher.join()?;
    Ok(())
}

#[test]
fn deleting_the_root_stops_the_watcher() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    fs::create_dir_all(root.join("a/b"))?;
    let (mut watcher, _recorder) = started(&root)?;

    fs::remove_dir_all(&root)?;

    assert!(wait_until(EVENT_TIMEOUT, || watcher.state() == WatcherState::Stopped));
    watcher.join()?;
    Ok(())
}

#[test]
fn no_events_after_stop() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();
    let (mut watcher, recorder) = started(&root)?;

    watcher.stop();
    watcher.join()?;
    assert_eq!(watcher.state(), WatcherState::Stopped);

    fs::write(root.join("late.txt"), "x")?;
    std::thread::sleep(QUIET_PERIOD);
    assert!(recorder.events().is_empty());

    // A stopped watcher cannot be restarted.
    assert!(matches!(watcher.start(), Err(WatchError::IllegalState { .. })));
    Ok(())
}

#[test]
fn start_rejects_missing_or_file_roots() -> TestResult {
    init_tracing();
    let (_dir, root) = workspace();

    let mut missing = Watcher::new(root.join("nope"), EventRecorder::new())?;
    assert!(matches!(missing.start(), Err(WatchError::RootNotFound(_))));
    assert_eq!(missing.state(), WatcherState::Idle);

    let file = root.join("plain.txt");
    fs::write(&file, "x")?;
    let mut not_dir = Watcher::new(&file, EventRecorder::new())?;
    assert!(matches!(not_dir.start(), Err(WatchError::NotADirectory(_))));
    Ok(())
}
