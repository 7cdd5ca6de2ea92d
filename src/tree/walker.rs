//! Filesystem walker for traversing source and replica trees

use crate::error::SyncError;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file
    File { path: PathBuf },
    /// A directory entry with its path
    Directory { path: PathBuf },
    /// A symlink or special file, never mirrored
    Other { path: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path } | Entry::Directory { path } | Entry::Other { path } => path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File { .. })
    }
}

/// Top-down filesystem walker
///
/// The root directory is yielded first, then every directory before its
/// contents. Siblings are visited in file-name order so repeated walks of an
/// unchanged tree produce the same sequence. Symbolic links are reported as
/// [`Entry::Other`] and never followed.
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lazily walk the tree
    ///
    /// Errors are yielded in place of the entry that could not be read, and
    /// the walk continues with the next entry.
    pub fn iter(&self) -> TreeIter {
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        TreeIter {
            inner: walker.into_iter(),
            root: self.root.clone(),
        }
    }

    /// Walk the whole tree and collect every entry, failing on the first error
    pub fn walk(&self) -> Result<Vec<Entry>, SyncError> {
        self.iter().collect()
    }
}

/// Iterator over a tree walk, see [`Walker::iter`]
pub struct TreeIter {
    inner: walkdir::IntoIter,
    root: PathBuf,
}

impl TreeIter {
    /// Stop descending into the directory that was yielded last
    ///
    /// Only meaningful directly after a [`Entry::Directory`] was returned.
    pub fn skip_current_dir(&mut self) {
        self.inner.skip_current_dir();
    }
}

impl Iterator for TreeIter {
    type Item = Result<Entry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(err) => return Some(Err(walk_error(err, &self.root))),
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            return Some(Ok(Entry::Directory {
                path: entry.into_path(),
            }));
        }
        if file_type.is_file() {
            return Some(Ok(Entry::File {
                path: entry.into_path(),
            }));
        }

        Some(Ok(Entry::Other {
            path: entry.into_path(),
        }))
    }
}

fn walk_error(err: walkdir::Error, root: &Path) -> SyncError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
    SyncError::Io { path, source }
}
