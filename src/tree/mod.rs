//! Filesystem tree access
//!
//! Walking, path mirroring and content fingerprinting used by the reconciler.

pub mod hasher;
pub mod path;
pub mod walker;
