use super::RemoteFs;
use crate::error::{CacheError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Remote access through the regular filesystem.
///
/// With a timeout set, each call runs on its own short-lived worker thread and
/// the caller stops waiting once the limit passes. A call stuck inside the OS
/// (typically a dead SMB/NFS share) keeps its thread until the kernel gives
/// up; nothing else is blocked by it.
#[derive(Debug, Clone)]
pub struct FsRemote {
    timeout: Option<Duration>,
}

impl FsRemote {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn bounded<T, F>(&self, op: &'static str, path: &Path, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let owned = path.to_path_buf();
        // Classification stats the parent folder, so it belongs on the worker.
        let call = move || f().map_err(|e| classify_on_remote(e, &owned));

        let Some(limit) = self.timeout else {
            return call();
        };

        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name(format!("remote-{op}"))
            .spawn(move || {
                let _ = tx.send(call());
            })
            .map_err(CacheError::Io)?;

        match rx.recv_timeout(limit) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => {
                debug!(op, path = %path.display(), "remote call abandoned after timeout");
                Err(CacheError::Timeout {
                    op,
                    path: path.to_path_buf(),
                    after: limit,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CacheError::RemoteUnreachable {
                path: path.to_path_buf(),
                source: io::Error::other("remote worker exited without a result"),
            }),
        }
    }
}

impl Default for FsRemote {
    fn default() -> Self {
        Self::new(Some(crate::model::DEFAULT_REMOTE_TIMEOUT))
    }
}

fn classify_on_remote(err: io::Error, path: &Path) -> CacheError {
    let parent_is_dir =
        err.kind() == io::ErrorKind::NotFound && path.parent().is_some_and(Path::is_dir);
    classify(err, path, parent_is_dir)
}

/// A missing file inside a reachable folder is "not found"; anything else
/// (missing share, permissions, network errors) is "unreachable".
fn classify(err: io::Error, path: &Path, parent_is_dir: bool) -> CacheError {
    if err.kind() == io::ErrorKind::NotFound && parent_is_dir {
        return CacheError::RemoteNotFound(path.to_path_buf());
    }
    CacheError::RemoteUnreachable {
        path: path.to_path_buf(),
        source: err,
    }
}

impl RemoteFs for FsRemote {
    fn dir_exists(&self, dir: &Path) -> bool {
        if dir.as_os_str().is_empty() {
            return false;
        }
        let owned = dir.to_path_buf();
        self.bounded("stat", dir, move || Ok(owned.is_dir()))
            .unwrap_or(false)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let owned = dir.to_path_buf();
        self.bounded("list", dir, move || {
            let mut names = Vec::new();
            for entry in fs::read_dir(&owned)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let owned = path.to_path_buf();
        self.bounded("metadata", path, move || fs::metadata(&owned)?.modified())
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> Result<SystemTime> {
        let src_owned = src.to_path_buf();
        let dest_owned: PathBuf = dest.to_path_buf();
        self.bounded("copy", src, move || {
            let modified = fs::metadata(&src_owned)?.modified()?;
            fs::copy(&src_owned, &dest_owned)?;
            Ok(modified)
        })
    }
}
