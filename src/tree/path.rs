//! Path mapping between the source and replica trees

use crate::error::SyncError;
use std::path::{Path, PathBuf};

/// Canonicalize a path that must exist
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, SyncError> {
    // dunce avoids UNC prefixes on Windows
    dunce::canonicalize(path).map_err(|e| {
        SyncError::InvalidPath(format!("Failed to canonicalize {}: {}", path.display(), e))
    })
}

/// Canonicalize a path that may not exist yet
///
/// The nearest existing ancestor is canonicalized and the missing tail is
/// re-appended, so a replica root that has not been created still resolves
/// to where it will live.
pub fn resolve_path(path: &Path) -> Result<PathBuf, SyncError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| SyncError::io(path, e))?
            .join(path)
    };

    let mut missing = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        if cursor.exists() {
            let mut resolved = canonicalize_path(cursor)?;
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        match (cursor.parent(), cursor.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                cursor = parent;
            }
            _ => {
                return Err(SyncError::InvalidPath(format!(
                    "No existing ancestor for {}",
                    path.display()
                )))
            }
        }
    }
}

/// Map `path` under `from_root` to the same relative position under `to_root`
pub fn mirror_path(path: &Path, from_root: &Path, to_root: &Path) -> Result<PathBuf, SyncError> {
    let relative = path.strip_prefix(from_root).map_err(|_| {
        SyncError::InvalidPath(format!(
            "{} is not under {}",
            path.display(),
            from_root.display()
        ))
    })?;

    if relative.as_os_str().is_empty() {
        Ok(to_root.to_path_buf())
    } else {
        Ok(to_root.join(relative))
    }
}

/// Reject source/replica pairs that would mirror a tree into itself
///
/// Identical roots and roots nested in either direction are refused.
pub fn ensure_disjoint(source: &Path, replica: &Path) -> Result<(), SyncError> {
    let source_resolved = resolve_path(source)?;
    let replica_resolved = resolve_path(replica)?;

    if source_resolved.starts_with(&replica_resolved)
        || replica_resolved.starts_with(&source_resolved)
    {
        return Err(SyncError::OverlappingRoots {
            source_root: source.to_path_buf(),
            replica_root: replica.to_path_buf(),
        });
    }

    Ok(())
}
