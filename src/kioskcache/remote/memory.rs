use super::RemoteFs;
use crate::error::{CacheError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct MemFile {
    content: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct Inner {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, MemFile>,
    offline: bool,
    broken_metadata: bool,
}

/// In-memory remote for tests.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// cache. Taking it `offline` makes every call fail as an unreachable share;
/// `copies()` counts copy attempts, successful or not.
#[derive(Debug, Clone, Default)]
pub struct MemRemote {
    inner: Arc<Mutex<Inner>>,
    copies: Arc<AtomicUsize>,
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, dir: P) {
        self.state().dirs.insert(dir.into());
    }

    /// Put a file, creating its parent folder.
    pub fn put<P: Into<PathBuf>>(&self, path: P, content: &[u8], modified: SystemTime) {
        let path = path.into();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            state.dirs.insert(parent.to_path_buf());
        }
        state.files.insert(
            path,
            MemFile {
                content: content.to_vec(),
                modified,
            },
        );
    }

    pub fn remove<P: AsRef<Path>>(&self, path: P) {
        self.state().files.remove(path.as_ref());
    }

    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Metadata reads fail while copies and listings still work.
    pub fn set_broken_metadata(&self, broken: bool) {
        self.state().broken_metadata = broken;
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn unreachable(path: &Path) -> CacheError {
        CacheError::RemoteUnreachable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotConnected, "share offline"),
        }
    }

    fn lookup(&self, path: &Path) -> Result<MemFile> {
        let state = self.state();
        if state.offline {
            return Err(Self::unreachable(path));
        }
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| CacheError::RemoteNotFound(path.to_path_buf()))
    }
}

impl RemoteFs for MemRemote {
    fn dir_exists(&self, dir: &Path) -> bool {
        let state = self.state();
        !state.offline && state.dirs.contains(dir)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let state = self.state();
        if state.offline || !state.dirs.contains(dir) {
            return Err(Self::unreachable(dir));
        }
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect())
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        if self.state().broken_metadata {
            return Err(Self::unreachable(path));
        }
        Ok(self.lookup(path)?.modified)
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> Result<SystemTime> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        let file = self.lookup(src)?;
        fs::write(dest, &file.content)?;
        Ok(file.modified)
    }
}
