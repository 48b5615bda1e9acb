//! # Remote Source
//!
//! The cache only ever *reads* the remote side: it checks that a folder is
//! there, lists it, reads modification times and copies files out. Those four
//! calls are the [`RemoteFs`] trait.
//!
//! ## Implementations
//!
//! - [`fs::FsRemote`]: the real filesystem (local folder or mounted network
//!   share). Every call is bounded by a timeout so a hung share cannot stall
//!   the caller forever.
//! - [`memory::MemRemote`]: in-memory double for tests, with an offline switch
//!   and a copy counter.
//!
//! Paths handed to a `RemoteFs` are always absolute remote paths built by the
//! cache (`remote root / filename`), never paths inside the cache root.

use crate::error::Result;
use std::path::Path;
use std::time::SystemTime;

pub mod fs;
#[cfg(any(test, feature = "test_utils"))]
pub mod memory;

pub trait RemoteFs {
    /// Whether `dir` exists and is a directory. Errors (including timeouts)
    /// are reported as `false`.
    fn dir_exists(&self, dir: &Path) -> bool;

    /// Names of the regular files directly inside `dir`. Subdirectories are
    /// not descended into.
    fn list_files(&self, dir: &Path) -> Result<Vec<String>>;

    /// Last-modified time of a remote file.
    fn modified(&self, path: &Path) -> Result<SystemTime>;

    /// Copy `src` to the local path `dest` (overwriting it) and return the
    /// source's last-modified time.
    fn copy_file(&self, src: &Path, dest: &Path) -> Result<SystemTime>;
}

impl<T: RemoteFs + ?Sized> RemoteFs for &T {
    fn dir_exists(&self, dir: &Path) -> bool {
        (**self).dir_exists(dir)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        (**self).list_files(dir)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        (**self).modified(path)
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> Result<SystemTime> {
        (**self).copy_file(src, dest)
    }
}
