//! Tree reconciliation: make a replica directory mirror a source directory.
//!
//! A run is two ordered passes over the whole tree:
//!
//! 1. **Create or update**: walk the source top-down, creating missing replica
//!    directories and copying files that are missing or whose fingerprints
//!    differ.
//! 2. **Prune**: walk the replica top-down, deleting directories and files that
//!    no longer exist in the source. A pruned directory is removed as a whole
//!    and its contents are not visited.
//!
//! Pass 1 always completes before pass 2 starts. Failures on individual
//! entries are reported to the [`EventSink`] as [`SyncEvent::ItemFailed`] and
//! the walk moves on; only an unusable source root aborts the run.

use crate::error::SyncError;
use crate::events::{EventSink, ItemAction, SyncEvent};
use crate::tree::hasher;
use crate::tree::path::mirror_path;
use crate::tree::walker::{Entry, Walker};
use crate::types::Fingerprint;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// One-way mirroring engine
///
/// Stateless between runs: everything is re-derived from the live
/// filesystem each time [`TreeReconciler::run`] is called.
pub struct TreeReconciler {
    sink: Arc<dyn EventSink>,
}

impl TreeReconciler {
    /// Create a reconciler that reports every action to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Make `replica_root` mirror `source_root`
    ///
    /// Returns an error only when the run cannot start: the source root is
    /// missing or unreadable, or the replica root cannot be created or is
    /// not a directory.
    #[instrument(skip_all, fields(source = %source_root.display(), replica = %replica_root.display()))]
    pub fn run(&self, source_root: &Path, replica_root: &Path) -> Result<(), SyncError> {
        check_source_root(source_root)?;
        self.prepare_replica_root(replica_root)?;

        self.create_or_update(source_root, replica_root)?;
        self.prune(source_root, replica_root);

        Ok(())
    }

    fn prepare_replica_root(&self, replica_root: &Path) -> Result<(), SyncError> {
        match fs::metadata(replica_root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(SyncError::InvalidPath(format!(
                "Replica root {} is not a directory",
                replica_root.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(replica_root).map_err(|e| SyncError::io(replica_root, e))?;
                self.sink.record(SyncEvent::DirectoryCreated {
                    path: replica_root.to_path_buf(),
                });
                Ok(())
            }
            Err(e) => Err(SyncError::io(replica_root, e)),
        }
    }

    /// Pass 1: top-down walk of the source
    fn create_or_update(&self, source_root: &Path, replica_root: &Path) -> Result<(), SyncError> {
        let mut entries = Walker::new(source_root).iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(SyncError::Io { path, source }) if path == source_root => {
                    return Err(SyncError::SourceUnavailable { path, source });
                }
                Err(err) => {
                    self.report_walk_error(err);
                    continue;
                }
            };

            let replica_path = match mirror_path(entry.path(), source_root, replica_root) {
                Ok(path) => path,
                Err(err) => {
                    self.report(ItemAction::Walk, entry.path(), &err);
                    continue;
                }
            };

            match entry {
                Entry::Directory { .. } => {
                    if !self.ensure_directory(&replica_path) {
                        // Nothing below can be copied into a missing directory
                        entries.skip_current_dir();
                    }
                }
                Entry::File { path } => {
                    self.update_file(&path, &replica_path);
                }
                Entry::Other { path } => {
                    // Links to regular files are mirrored as plain files
                    if is_file(&path) {
                        self.update_file(&path, &replica_path);
                    } else {
                        warn!(path = %path.display(), "Skipping source entry that is not a file or directory");
                    }
                }
            }
        }

        Ok(())
    }

    /// Make sure `replica_dir` exists as a directory; false if it could not be made
    fn ensure_directory(&self, replica_dir: &Path) -> bool {
        match fs::symlink_metadata(replica_dir) {
            Ok(metadata) if metadata.is_dir() => return true,
            Ok(_) => {
                // A file or link sits where the source has a directory
                if let Err(e) = fs::remove_file(replica_dir) {
                    self.report(ItemAction::DeleteFile, replica_dir, &e);
                    return false;
                }
                self.sink.record(SyncEvent::FileDeleted {
                    path: replica_dir.to_path_buf(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                self.report(ItemAction::CreateDirectory, replica_dir, &e);
                return false;
            }
        }

        match fs::create_dir_all(replica_dir) {
            Ok(()) => {
                self.sink.record(SyncEvent::DirectoryCreated {
                    path: replica_dir.to_path_buf(),
                });
                true
            }
            Err(e) => {
                self.report(ItemAction::CreateDirectory, replica_dir, &e);
                false
            }
        }
    }

    /// Copy `source_file` over `replica_file` unless their contents already match
    fn update_file(&self, source_file: &Path, replica_file: &Path) {
        match fs::symlink_metadata(replica_file) {
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                self.report(ItemAction::CopyFile, replica_file, &e);
                return;
            }
            Ok(metadata) if metadata.is_dir() => {
                // A directory sits where the source has a file
                if let Err(e) = fs::remove_dir_all(replica_file) {
                    self.report(ItemAction::DeleteDirectory, replica_file, &e);
                    return;
                }
                self.sink.record(SyncEvent::DirectoryDeleted {
                    path: replica_file.to_path_buf(),
                });
            }
            Ok(metadata) if !metadata.is_file() => {
                // Never write through a link
                if let Err(e) = fs::remove_file(replica_file) {
                    self.report(ItemAction::DeleteFile, replica_file, &e);
                    return;
                }
                self.sink.record(SyncEvent::FileDeleted {
                    path: replica_file.to_path_buf(),
                });
            }
            Ok(_) => {
                let source_fp = match hasher::fingerprint(source_file) {
                    Ok(fp) => fp,
                    Err(err) => {
                        self.report_error(ItemAction::CopyFile, err);
                        return;
                    }
                };
                if replica_matches(replica_file, source_fp) {
                    debug!(path = %replica_file.display(), fingerprint = %source_fp, "Replica file up to date");
                    return;
                }
            }
        }

        match copy_file(source_file, replica_file) {
            Ok(()) => self.sink.record(SyncEvent::FileCopied {
                source: source_file.to_path_buf(),
                destination: replica_file.to_path_buf(),
            }),
            Err(err) => self.report_error(ItemAction::CopyFile, err),
        }
    }

    /// Pass 2: top-down walk of the replica
    fn prune(&self, source_root: &Path, replica_root: &Path) {
        let mut entries = Walker::new(replica_root).iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.report_walk_error(err);
                    continue;
                }
            };

            let replica_path = entry.path();
            if replica_path == replica_root {
                continue;
            }

            let source_path = match mirror_path(replica_path, replica_root, source_root) {
                Ok(path) => path,
                Err(err) => {
                    self.report(ItemAction::Walk, replica_path, &err);
                    continue;
                }
            };

            match &entry {
                Entry::Directory { path } => {
                    if is_directory(&source_path) {
                        continue;
                    }
                    entries.skip_current_dir();
                    match fs::remove_dir_all(path) {
                        Ok(()) => self.sink.record(SyncEvent::DirectoryDeleted { path: path.clone() }),
                        Err(e) => self.report(ItemAction::DeleteDirectory, path, &e),
                    }
                }
                Entry::File { path } | Entry::Other { path } => {
                    if entry.is_file() && is_file(&source_path) {
                        continue;
                    }
                    match fs::remove_file(path) {
                        Ok(()) => self.sink.record(SyncEvent::FileDeleted { path: path.clone() }),
                        Err(e) => self.report(ItemAction::DeleteFile, path, &e),
                    }
                }
            }
        }
    }

    fn report(&self, action: ItemAction, path: &Path, error: &dyn std::fmt::Display) {
        self.sink.record(SyncEvent::ItemFailed {
            action,
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    fn report_error(&self, action: ItemAction, err: SyncError) {
        match err {
            SyncError::Io { path, source } | SyncError::SourceUnavailable { path, source } => {
                self.report(action, &path, &source)
            }
            other => self.sink.record(SyncEvent::ItemFailed {
                action,
                path: Default::default(),
                error: other.to_string(),
            }),
        }
    }

    fn report_walk_error(&self, err: SyncError) {
        self.report_error(ItemAction::Walk, err)
    }
}

/// The source root must be a readable directory before anything is touched
fn check_source_root(source_root: &Path) -> Result<(), SyncError> {
    let unavailable = |source: io::Error| SyncError::SourceUnavailable {
        path: source_root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(source_root).map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(unavailable(io::Error::new(
            ErrorKind::Other,
            "not a directory",
        )));
    }
    fs::read_dir(source_root).map_err(unavailable)?;
    Ok(())
}

fn is_directory(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// True for regular files and links that resolve to one
fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Whether the replica file already holds content with `source_fp`
///
/// A replica that cannot be read counts as different.
fn replica_matches(replica_file: &Path, source_fp: Fingerprint) -> bool {
    match hasher::fingerprint(replica_file) {
        Ok(replica_fp) => replica_fp == source_fp,
        Err(err) => {
            debug!(error = %err, "Replica file unreadable, overwriting");
            false
        }
    }
}

/// Copy bytes, modification time and permissions from `from` to `to`
///
/// An existing destination is overwritten, even if it was read-only. If the
/// copy fails, a destination that was made writable gets its old mode back.
fn copy_file(from: &Path, to: &Path) -> Result<(), SyncError> {
    let mut reader = File::open(from).map_err(|e| SyncError::io(from, e))?;
    let source_meta = reader.metadata().map_err(|e| SyncError::io(from, e))?;

    let restore = match fs::metadata(to) {
        Ok(metadata) if metadata.permissions().readonly() => {
            let previous = metadata.permissions();
            make_writable(to, previous.clone()).map_err(|e| SyncError::io(to, e))?;
            Some(previous)
        }
        _ => None,
    };

    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(to)
        .map_err(|e| SyncError::io(to, e))
        .and_then(|mut writer| {
            copy_stream(&mut reader, &mut writer, from, to)?;
            if let Ok(modified) = source_meta.modified() {
                writer
                    .set_modified(modified)
                    .map_err(|e| SyncError::io(to, e))?;
            }
            Ok(())
        });

    if let Err(err) = written {
        if let Some(previous) = restore {
            let _ = fs::set_permissions(to, previous);
        }
        return Err(err);
    }

    fs::set_permissions(to, source_meta.permissions()).map_err(|e| SyncError::io(to, e))?;
    Ok(())
}

/// Stream `reader` into `writer`, blaming read errors on `from` and write errors on `to`
fn copy_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    from: &Path,
    to: &Path,
) -> Result<(), SyncError> {
    let mut buffer = [0u8; hasher::CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::io(from, e)),
        };
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| SyncError::io(to, e))?;
    }
    writer.flush().map_err(|e| SyncError::io(to, e))
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path, mut permissions: Permissions) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
