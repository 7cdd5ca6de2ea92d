//! Idempotence, convergence and sibling safety across repeated runs

use super::test_utils::{count, snapshot, write_file, Roots};
use foldersync::events::SyncEvent;
use std::fs;

fn populate(roots: &Roots) {
    write_file(&roots.source, "top.txt", "top");
    write_file(&roots.source, "docs/readme.md", "# readme");
    write_file(&roots.source, "docs/guide/intro.md", "intro");
    write_file(&roots.source, "data/raw/values.csv", "1,2,3");
    fs::create_dir_all(roots.source.join("empty/nested")).unwrap();
}

#[test]
fn test_second_run_emits_nothing() {
    let roots = Roots::new();
    populate(&roots);

    let first = roots.sync();
    assert!(!first.is_empty());

    let second = roots.sync();
    assert!(second.is_empty(), "unexpected events: {:?}", second);
}

#[test]
fn test_replica_converges_to_source() {
    let roots = Roots::with_replica();
    populate(&roots);
    write_file(&roots.replica, "top.txt", "stale");
    write_file(&roots.replica, "docs/obsolete.md", "gone");
    write_file(&roots.replica, "trash/a/b/c.txt", "gone");

    roots.sync();

    assert_eq!(snapshot(&roots.source), snapshot(&roots.replica));
}

#[test]
fn test_converges_after_source_changes() {
    let roots = Roots::new();
    populate(&roots);
    roots.sync();

    fs::remove_dir_all(roots.source.join("docs")).unwrap();
    write_file(&roots.source, "data/raw/values.csv", "4,5,6");
    write_file(&roots.source, "data/new.txt", "new");

    let events = roots.sync();

    assert_eq!(snapshot(&roots.source), snapshot(&roots.replica));
    assert_eq!(
        count(&events, |e| matches!(e, SyncEvent::DirectoryDeleted { .. })),
        1
    );
    assert_eq!(
        count(&events, |e| matches!(e, SyncEvent::FileCopied { .. })),
        2
    );
    assert_eq!(
        count(&events, |e| matches!(e, SyncEvent::FileDeleted { .. })),
        0
    );
}

#[test]
fn test_pruning_leaves_siblings_intact() {
    let roots = Roots::with_replica();
    write_file(&roots.source, "keep/a.txt", "a");
    write_file(&roots.source, "keep/sub/b.txt", "b");
    write_file(&roots.replica, "keep/a.txt", "a");
    write_file(&roots.replica, "keep/sub/b.txt", "b");
    write_file(&roots.replica, "keep-old/a.txt", "a");
    write_file(&roots.replica, "drop/sub/c.txt", "c");

    let events = roots.sync();

    assert!(roots.replica.join("keep/a.txt").exists());
    assert!(roots.replica.join("keep/sub/b.txt").exists());
    assert!(!roots.replica.join("keep-old").exists());
    assert!(!roots.replica.join("drop").exists());
    assert_eq!(
        count(&events, |e| matches!(e, SyncEvent::DirectoryDeleted { .. })),
        2
    );
}

#[test]
fn test_empty_source_empties_replica_but_keeps_root() {
    let roots = Roots::with_replica();
    write_file(&roots.replica, "x/y.txt", "y");
    write_file(&roots.replica, "z.txt", "z");

    roots.sync();

    assert!(roots.replica.is_dir());
    assert!(snapshot(&roots.replica).is_empty());
}
