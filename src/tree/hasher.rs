//! Content fingerprinting for mirrored files using MD5
//!
//! Files are streamed through the digest in fixed-size chunks so peak memory
//! stays at one chunk regardless of file size.

use crate::error::SyncError;
use crate::types::Fingerprint;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read size used when streaming a file through the digest
pub const CHUNK_SIZE: usize = 4096;

/// Compute the fingerprint of a file's full contents
///
/// Fails if the file cannot be opened or if any read fails part way through;
/// no partial digest is ever returned. Every call re-reads the whole file.
pub fn fingerprint(path: &Path) -> Result<Fingerprint, SyncError> {
    let file = File::open(path).map_err(|e| SyncError::io(path, e))?;
    fingerprint_reader(file).map_err(|e| SyncError::io(path, e))
}

/// Compute the fingerprint of everything a reader yields
pub fn fingerprint_reader<R: Read>(mut reader: R) -> std::io::Result<Fingerprint> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint::from_bytes(hasher.finalize().into()))
}

/// Compute the fingerprint of an in-memory buffer
pub fn fingerprint_bytes(content: &[u8]) -> Fingerprint {
    let mut hasher = Md5::new();
    hasher.update(content);
    Fingerprint::from_bytes(hasher.finalize().into())
}
