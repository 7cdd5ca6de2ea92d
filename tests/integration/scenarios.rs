//! End-to-end mirroring scenarios

use super::test_utils::{count, write_file, Roots};
#[cfg(target_os = "linux")]
use super::test_utils::{long_path_root, overlong_name, LONG_ROOT_LEN};
use foldersync::events::{ItemAction, MemorySink, SyncEvent};
use foldersync::TreeReconciler;
use std::fs;
use std::sync::Arc;

#[test]
fn test_copies_into_empty_replica() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "a/b.txt", "X");

    let events = roots.sync();

    assert_eq!(fs::read_to_string(roots.replica.join("a/b.txt")).unwrap(), "X");
    assert_eq!(
        events,
        vec![
            SyncEvent::DirectoryCreated {
                path: roots.replica.join("a"),
            },
            SyncEvent::FileCopied {
                source: roots.source.join("a/b.txt"),
                destination: roots.replica.join("a/b.txt"),
            },
        ]
    );
}

#[test]
fn test_identical_file_is_not_copied() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "a/b.txt", "X");
    write_file(&roots.replica, "a/b.txt", "X");

    let events = roots.sync();

    assert_eq!(
        count(&events, |e| matches!(e, SyncEvent::FileCopied { .. })),
        0
    );
    assert!(events.is_empty(), "unexpected events: {:?}", events);
}

#[test]
fn test_changed_file_is_updated() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "a/b.txt", "Y");
    write_file(&roots.replica, "a/b.txt", "X");

    let events = roots.sync();

    assert_eq!(fs::read_to_string(roots.replica.join("a/b.txt")).unwrap(), "Y");
    assert_eq!(
        events,
        vec![SyncEvent::FileCopied {
            source: roots.source.join("a/b.txt"),
            destination: roots.replica.join("a/b.txt"),
        }]
    );
}

#[test]
fn test_same_size_different_content_is_updated() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "f.bin", "abcd");
    write_file(&roots.replica, "f.bin", "abce");

    let events = roots.sync();

    assert_eq!(fs::read_to_string(roots.replica.join("f.bin")).unwrap(), "abcd");
    assert_eq!(events.len(), 1);
}

#[test]
fn test_removed_directory_is_pruned_as_a_whole() {
    let roots = Roots::with_replica();
    write_file(&roots.replica, "c/d.txt", "old");
    write_file(&roots.replica, "c/deeper/e.txt", "old");

    let events = roots.sync();

    assert!(!roots.replica.join("c").exists());
    assert_eq!(
        events,
        vec![SyncEvent::DirectoryDeleted {
            path: roots.replica.join("c"),
        }]
    );
}

#[test]
fn test_removed_file_is_pruned() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "keep.txt", "k");
    write_file(&roots.replica, "keep.txt", "k");
    write_file(&roots.replica, "stale.txt", "s");

    let events = roots.sync();

    assert!(roots.replica.join("keep.txt").exists());
    assert!(!roots.replica.join("stale.txt").exists());
    assert_eq!(
        events,
        vec![SyncEvent::FileDeleted {
            path: roots.replica.join("stale.txt"),
        }]
    );
}

#[test]
fn test_creates_before_prunes() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "new/file.txt", "n");
    write_file(&roots.replica, "old/file.txt", "o");

    let events = roots.sync();

    let created = events
        .iter()
        .position(|e| matches!(e, SyncEvent::FileCopied { .. }))
        .unwrap();
    let deleted = events
        .iter()
        .position(|e| matches!(e, SyncEvent::DirectoryDeleted { .. }))
        .unwrap();
    assert!(created < deleted);
}

#[test]
fn test_missing_replica_root_is_created() {
    let roots = Roots::new();
    write_file(&roots.source, "f.txt", "f");

    let events = roots.sync();

    assert_eq!(
        events[0],
        SyncEvent::DirectoryCreated {
            path: roots.replica.clone(),
        }
    );
    assert_eq!(fs::read_to_string(roots.replica.join("f.txt")).unwrap(), "f");
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_item_is_skipped_and_rest_converges() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let long_name = overlong_name();
    write_file(&source, "a.txt", "a");
    write_file(&source, &long_name, "long");
    write_file(&source, "sub/b.txt", "b");
    write_file(&source, "zz/c.txt", "c");
    let replica = long_path_root(temp_dir.path());
    assert_eq!(replica.as_os_str().len(), LONG_ROOT_LEN);

    let sink = Arc::new(MemorySink::new());
    TreeReconciler::new(sink.clone())
        .run(&source, &replica)
        .unwrap();

    let failures = sink.failures();
    assert_eq!(failures.len(), 1, "{:?}", failures);
    match &failures[0] {
        SyncEvent::ItemFailed { action, path, .. } => {
            assert_eq!(*action, ItemAction::CopyFile);
            assert_eq!(path, &replica.join(&long_name));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(replica.join("a.txt")).unwrap(), "a");
    assert_eq!(fs::read_to_string(replica.join("sub/b.txt")).unwrap(), "b");
    assert_eq!(fs::read_to_string(replica.join("zz/c.txt")).unwrap(), "c");
    assert_eq!(
        count(&sink.events(), |e| matches!(e, SyncEvent::FileCopied { .. })),
        3
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_delete_is_reported_and_prune_continues() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    write_file(&source, "keep.txt", "k");
    let replica = long_path_root(temp_dir.path());
    let long_name = overlong_name();
    // Created relative to the replica root, the only way to reach it
    let status = std::process::Command::new("touch")
        .arg(&long_name)
        .current_dir(&replica)
        .status()
        .unwrap();
    assert!(status.success());
    write_file(&replica, "z.txt", "stale");

    let sink = Arc::new(MemorySink::new());
    TreeReconciler::new(sink.clone())
        .run(&source, &replica)
        .unwrap();

    let failures = sink.failures();
    assert_eq!(failures.len(), 1, "{:?}", failures);
    match &failures[0] {
        SyncEvent::ItemFailed { action, path, .. } => {
            assert!(matches!(action, ItemAction::DeleteFile | ItemAction::Walk));
            assert_eq!(path, &replica.join(&long_name));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(replica.join("keep.txt").exists());
    assert!(!replica.join("z.txt").exists());
    assert!(sink.events().contains(&SyncEvent::FileDeleted {
        path: replica.join("z.txt"),
    }));
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let roots = Roots::with_replica();
    write_file(&roots.source, "a/locked.txt", "secret");
    write_file(&roots.source, "a/open.txt", "open");
    write_file(&roots.source, "z.txt", "z");
    let locked = roots.source.join("a/locked.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through file modes
    if fs::File::open(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let sink = Arc::new(MemorySink::new());
    TreeReconciler::new(sink.clone())
        .run(&roots.source, &roots.replica)
        .unwrap();

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    match &failures[0] {
        SyncEvent::ItemFailed { action, path, .. } => {
            assert_eq!(*action, ItemAction::CopyFile);
            assert_eq!(path, &locked);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!roots.replica.join("a/locked.txt").exists());
    assert_eq!(fs::read_to_string(roots.replica.join("a/open.txt")).unwrap(), "open");
    assert_eq!(fs::read_to_string(roots.replica.join("z.txt")).unwrap(), "z");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_replica_symlink_is_replaced_not_written_through() {
    let roots = Roots::with_replica();
    let outside = roots.source.parent().unwrap().join("outside.txt");
    fs::write(&outside, "untouched").unwrap();
    write_file(&roots.source, "f.txt", "new");
    std::os::unix::fs::symlink(&outside, roots.replica.join("f.txt")).unwrap();

    roots.sync();

    assert_eq!(fs::read_to_string(&outside).unwrap(), "untouched");
    let meta = fs::symlink_metadata(roots.replica.join("f.txt")).unwrap();
    assert!(meta.is_file());
    assert_eq!(fs::read_to_string(roots.replica.join("f.txt")).unwrap(), "new");
}

#[cfg(unix)]
#[test]
fn test_source_links_to_files_are_mirrored_as_files() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "real.txt", "r");
    let outside = roots.source.parent().unwrap().join("shared.txt");
    fs::write(&outside, "payload").unwrap();
    std::os::unix::fs::symlink(&outside, roots.source.join("linked.txt")).unwrap();
    let outside_dir = roots.source.parent().unwrap().join("shared-dir");
    fs::create_dir(&outside_dir).unwrap();
    std::os::unix::fs::symlink(&outside_dir, roots.source.join("dir-link")).unwrap();

    roots.sync();

    let linked = roots.replica.join("linked.txt");
    assert!(fs::symlink_metadata(&linked).unwrap().is_file());
    assert_eq!(fs::read_to_string(&linked).unwrap(), "payload");
    assert!(fs::symlink_metadata(roots.replica.join("dir-link")).is_err());
    assert!(roots.sync().is_empty());
}
