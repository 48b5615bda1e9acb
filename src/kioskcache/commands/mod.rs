use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::model::CachePolicy;
use crate::remote::RemoteFs;
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub mod cleanup;
pub mod config;
pub mod get;
pub mod prime;
pub mod status;
pub mod sync;

/// Folder inside the cache root that holds in-flight downloads. Being a
/// directory, it never shows up as a cached file.
pub const INCOMING_DIR: &str = ".incoming";

/// Everything the cache operations need: where the cache lives, where the
/// remote lives, how to reach it and the timing policy.
pub struct CacheContext<R: RemoteFs> {
    pub cache_root: PathBuf,
    pub remote_root: PathBuf,
    pub remote: R,
    pub policy: CachePolicy,
    locks: KeyLocks,
}

impl<R: RemoteFs> CacheContext<R> {
    pub fn new(cache_root: PathBuf, remote_root: PathBuf, remote: R, policy: CachePolicy) -> Self {
        Self {
            cache_root,
            remote_root,
            remote,
            policy,
            locks: KeyLocks::default(),
        }
    }

    pub fn local_path(&self, filename: &str) -> PathBuf {
        self.cache_root.join(filename)
    }

    pub fn remote_path(&self, filename: &str) -> Result<PathBuf> {
        if !self.remote_configured() {
            return Err(CacheError::RemoteNotConfigured);
        }
        Ok(self.remote_root.join(filename))
    }

    pub fn remote_configured(&self) -> bool {
        !self.remote_root.as_os_str().is_empty()
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.cache_root.join(INCOMING_DIR)
    }

    /// Run `f` while holding the lock for `filename`. Fetches, sync deletes
    /// and cleanup deletes of one name never overlap.
    pub(crate) fn with_lock<T>(&self, filename: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.for_key(filename);
        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        drop(lock);
        self.locks.release(filename);
        result
    }
}

/// One mutex per filename, created on first use and dropped once nobody
/// holds or waits on it.
#[derive(Debug, Default)]
struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    fn for_key(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Cloning in `for_key` and this check both run under the shard lock, so
    /// an entry with a waiter is never removed.
    fn release(&self, key: &str) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Regular files directly inside the cache root, with their metadata.
pub fn local_files(cache_root: &Path) -> io::Result<Vec<(String, fs::Metadata)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(cache_root)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), meta));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub config: Option<CacheConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::remote::memory::MemRemote;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    pub const REMOTE_ROOT: &str = "/share/media";

    pub fn remote_file(name: &str) -> PathBuf {
        Path::new(REMOTE_ROOT).join(name)
    }

    pub fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    /// A cache rooted in a temp dir over an in-memory remote that already has
    /// its media folder.
    pub fn context() -> (TempDir, MemRemote, CacheContext<MemRemote>) {
        let dir = tempfile::tempdir().unwrap();
        let remote = MemRemote::new();
        remote.add_dir(REMOTE_ROOT);
        let ctx = CacheContext::new(
            dir.path().to_path_buf(),
            PathBuf::from(REMOTE_ROOT),
            remote.clone(),
            CachePolicy::default(),
        );
        (dir, remote, ctx)
    }

    pub fn write_local(ctx: &CacheContext<MemRemote>, name: &str, content: &[u8], mtime: SystemTime) {
        let path = ctx.local_path(name);
        fs::write(&path, content).unwrap();
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(mtime)).unwrap();
    }

    pub fn local_names(ctx: &CacheContext<MemRemote>) -> Vec<String> {
        local_files(&ctx.cache_root)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn local_files_skips_directories() {
        let (_dir, _remote, ctx) = context();
        fs::create_dir_all(ctx.incoming_dir()).unwrap();
        fs::write(ctx.incoming_dir().join("x.jpg.part"), b"partial").unwrap();
        write_local(&ctx, "a.jpg", b"a", at(0));

        assert_eq!(local_names(&ctx), vec!["a.jpg".to_string()]);
    }

    #[test]
    fn empty_remote_root_is_not_configured() {
        let (dir, remote, _) = context();
        let ctx = CacheContext::new(
            dir.path().to_path_buf(),
            PathBuf::new(),
            remote,
            CachePolicy::default(),
        );
        assert!(matches!(
            ctx.remote_path("a.jpg"),
            Err(CacheError::RemoteNotConfigured)
        ));
    }

    #[test]
    fn same_key_shares_a_lock() {
        let locks = KeyLocks::default();
        let a = locks.for_key("a.jpg");
        let again = locks.for_key("a.jpg");
        let b = locks.for_key("b.jpg");
        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unused_locks_are_released() {
        let (_dir, _remote, ctx) = context();
        for name in ["a.jpg", "missing.jpg", "b.mp4"] {
            ctx.with_lock(name, || ());
        }
        assert_eq!(ctx.locks.len(), 0);
    }

    #[test]
    fn lock_with_a_waiter_is_kept() {
        let locks = KeyLocks::default();
        let held = locks.for_key("a.jpg");
        let waiter = locks.for_key("a.jpg");
        drop(held);
        locks.release("a.jpg");
        assert_eq!(locks.len(), 1);

        drop(waiter);
        locks.release("a.jpg");
        assert_eq!(locks.len(), 0);
    }
}
