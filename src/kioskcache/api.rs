//! # API Facade
//!
//! [`MediaCache`] is the single entry point hosts use. It owns the cache
//! context and the reconciliation cursor and dispatches to `commands/*.rs`,
//! where the behaviour lives.
//!
//! ## Generic Over RemoteFs
//!
//! - Production: `MediaCache<FsRemote>`
//! - Testing: `MediaCache<MemRemote>`
//!
//! All methods take `&self`: per-filename locks and the sync cursor are
//! internally synchronised, so one instance can be shared across threads
//! (wrap it in an `Arc`). One instance should own a cache root; two
//! processes on the same root can race on sync and cleanup.

use crate::commands::{self, CacheContext, INCOMING_DIR};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::model::{CachePolicy, CachedMedia};
use crate::node::{resolve_media_path, NodeRole};
use crate::paths;
use crate::remote::fs::FsRemote;
use crate::remote::RemoteFs;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

pub use commands::cleanup::CleanupReport;
pub use commands::config::ConfigAction;
pub use commands::prime::PrimeReport;
pub use commands::status::StatusReport;
pub use commands::sync::SyncReport;
pub use commands::{CmdMessage, CmdResult, MessageLevel};

pub struct MediaCache<R: RemoteFs> {
    ctx: CacheContext<R>,
    sync_gate: commands::sync::SyncGate,
}

impl MediaCache<FsRemote> {
    /// Cache rooted at `<LocalAppData>/DBNext/MediaCache` over the real
    /// filesystem. The remote is not touched until the first operation.
    pub fn new(remote_root: impl Into<PathBuf>) -> Result<Self> {
        let policy = CachePolicy::default();
        let remote = FsRemote::new(policy.remote_timeout);
        Self::open(paths::default_cache_root()?, remote_root, remote, policy)
    }

    /// Build from configuration, applying the slave path rewrite.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let role = NodeRole::from_server(&config.server);
        let remote_root = resolve_media_path(&config.remote_path, &role);
        let cache_root = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => paths::default_cache_root()?,
        };
        let policy = config.policy();
        let remote = FsRemote::new(policy.remote_timeout);
        Self::open(cache_root, remote_root, remote, policy)
    }
}

impl<R: RemoteFs> MediaCache<R> {
    /// Create (if needed) the cache root and sweep downloads abandoned by an
    /// earlier process. Existing cached files are left as they are.
    pub fn open(
        cache_root: impl Into<PathBuf>,
        remote_root: impl Into<PathBuf>,
        remote: R,
        policy: CachePolicy,
    ) -> Result<Self> {
        let cache_root = cache_root.into();
        fs::create_dir_all(&cache_root)?;
        let swept = commands::cleanup::sweep_partials(&cache_root.join(INCOMING_DIR), None);
        if swept > 0 {
            debug!(swept, "cleared partial downloads from an earlier run");
        }

        let remote_root = remote_root.into();
        info!(cache = %cache_root.display(), remote = %remote_root.display(), "media cache ready");

        let sync_gate = commands::sync::SyncGate::new(policy.sync_interval);
        Ok(Self {
            ctx: CacheContext::new(cache_root, remote_root, remote, policy),
            sync_gate,
        })
    }

    pub fn cache_root(&self) -> &Path {
        &self.ctx.cache_root
    }

    pub fn remote_root(&self) -> &Path {
        &self.ctx.remote_root
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.ctx.policy
    }

    pub fn get_media_path(&self, filename: &str) -> Result<CachedMedia> {
        commands::get::run(&self.ctx, filename)
    }

    pub fn cache_slideshow_folder(&self, folder: &Path) -> PrimeReport {
        commands::prime::run(&self.ctx, folder)
    }

    /// Prime the remote root itself, the usual folder-mode call.
    pub fn cache_remote_folder(&self) -> PrimeReport {
        commands::prime::run(&self.ctx, &self.ctx.remote_root)
    }

    /// Also clears part files abandoned by timed-out copies, so a
    /// long-running host does not collect them between restarts.
    pub fn sync_with_remote(&self) -> SyncReport {
        let report = commands::sync::run(&self.ctx);
        commands::cleanup::sweep_abandoned(&self.ctx, SystemTime::now());
        report
    }

    pub fn sync_if_needed(&self) -> Option<SyncReport> {
        self.sync_if_needed_at(Utc::now())
    }

    /// Run a reconciliation pass if the sync interval has elapsed at `now`.
    /// Returns `None` when the call was a no-op.
    pub fn sync_if_needed_at(&self, now: DateTime<Utc>) -> Option<SyncReport> {
        if !self.sync_gate.try_claim(now) {
            return None;
        }
        Some(self.sync_with_remote())
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.sync_gate.last_sync()
    }

    pub fn cleanup_old_files(&self, days_old: u64) -> CleanupReport {
        self.cleanup_old_files_at(days_old, SystemTime::now())
    }

    pub fn cleanup_old_files_at(&self, days_old: u64, now: SystemTime) -> CleanupReport {
        commands::cleanup::run(&self.ctx, days_old, now)
    }

    pub fn is_remote_accessible(&self) -> bool {
        self.ctx.remote_configured() && self.ctx.remote.dir_exists(&self.ctx.remote_root)
    }

    pub fn status(&self) -> Result<StatusReport> {
        commands::status::run(&self.ctx, self.last_sync())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::model::CacheOutcome;
    use crate::remote::memory::MemRemote;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    const ROOT: &str = "/share/media";

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn cache(dir: &Path, remote: &MemRemote) -> MediaCache<MemRemote> {
        MediaCache::open(dir, ROOT, remote.clone(), CachePolicy::default()).unwrap()
    }

    #[test]
    fn open_is_idempotent_and_keeps_content() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("a.jpg"), b"pixels", at(0));

        let first = cache(dir.path(), &remote);
        first.get_media_path("a.jpg").unwrap();
        drop(first);

        let second = cache(dir.path(), &remote);
        assert_eq!(fs::read(second.cache_root().join("a.jpg")).unwrap(), b"pixels");
        assert_eq!(remote.copies(), 1);
    }

    #[test]
    fn open_does_not_touch_the_remote() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.set_offline(true);
        let cache = MediaCache::open(dir.path(), "", remote.clone(), CachePolicy::default());
        assert!(cache.is_ok());
        assert_eq!(remote.copies(), 0);
    }

    #[test]
    fn open_sweeps_abandoned_partials() {
        let dir = tempdir().unwrap();
        let incoming = dir.path().join(INCOMING_DIR);
        fs::create_dir_all(&incoming).unwrap();
        fs::write(incoming.join("a.jpg.1234.part"), b"half").unwrap();

        let _cache = cache(dir.path(), &MemRemote::new());
        assert_eq!(fs::read_dir(&incoming).unwrap().count(), 0);
    }

    #[test]
    fn sync_if_needed_runs_once_per_interval() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("keep.jpg"), b"k", at(0));
        let cache = cache(dir.path(), &remote);
        let t0 = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();

        fs::write(dir.path().join("orphan1.jpg"), b"o").unwrap();
        assert!(cache.sync_if_needed_at(t0).is_some());
        assert!(!dir.path().join("orphan1.jpg").exists());

        fs::write(dir.path().join("orphan2.jpg"), b"o").unwrap();
        assert!(cache.sync_if_needed_at(t0 + chrono::Duration::minutes(2)).is_none());
        assert!(dir.path().join("orphan2.jpg").exists());

        let report = cache
            .sync_if_needed_at(t0 + chrono::Duration::minutes(6))
            .unwrap();
        assert_eq!(report.removed, vec!["orphan2.jpg".to_string()]);
        assert_eq!(cache.last_sync(), Some(t0 + chrono::Duration::minutes(6)));
    }

    #[test]
    fn accessibility_follows_the_remote() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.add_dir(ROOT);
        let cache = cache(dir.path(), &remote);
        assert!(cache.is_remote_accessible());
        remote.set_offline(true);
        assert!(!cache.is_remote_accessible());

        let unconfigured =
            MediaCache::open(dir.path(), "", MemRemote::new(), CachePolicy::default()).unwrap();
        assert!(!unconfigured.is_remote_accessible());
    }

    #[test]
    fn prime_then_serve_from_cache_while_offline() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("a.jpg"), b"a", at(0));
        remote.put(Path::new(ROOT).join("b.mov"), b"b", at(0));
        let cache = cache(dir.path(), &remote);

        let report = cache.cache_remote_folder();
        assert_eq!((report.cached, report.total), (2, 2));

        remote.set_offline(true);
        let got = cache.get_media_path("b.mov").unwrap();
        assert_eq!(got.outcome, CacheOutcome::Hit);
        assert!(cache.get_media_path("c.jpg").is_err());
    }

    #[test]
    fn concurrent_requests_copy_once() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("a.jpg"), b"a", at(0));
        let cache = std::sync::Arc::new(cache(dir.path(), &remote));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.get_media_path("a.jpg").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(remote.copies(), 1);
    }

    #[test]
    fn cleanup_uses_given_clock() {
        let dir = tempdir().unwrap();
        let cache = cache(dir.path(), &MemRemote::new());
        let path = dir.path().join("old.jpg");
        fs::write(&path, b"x").unwrap();
        filetime::set_file_atime(&path, filetime::FileTime::from_system_time(at(0))).unwrap();

        let report = cache.cleanup_old_files_at(30, at(31 * 24 * 60 * 60));
        assert_eq!(report.removed, vec!["old.jpg".to_string()]);
    }

    /// Stats go through to the in-memory remote; listings and copies hit
    /// the remote timeout.
    struct TimingOut(MemRemote);

    fn timed_out(op: &'static str, path: &Path) -> CacheError {
        CacheError::Timeout {
            op,
            path: path.to_path_buf(),
            after: Duration::from_secs(30),
        }
    }

    impl RemoteFs for TimingOut {
        fn dir_exists(&self, dir: &Path) -> bool {
            self.0.dir_exists(dir)
        }
        fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
            Err(timed_out("list", dir))
        }
        fn modified(&self, path: &Path) -> Result<SystemTime> {
            self.0.modified(path)
        }
        fn copy_file(&self, src: &Path, _dest: &Path) -> Result<SystemTime> {
            Err(timed_out("copy", src))
        }
    }

    fn timing_out_cache(dir: &Path, remote: &MemRemote) -> MediaCache<TimingOut> {
        MediaCache::open(dir, ROOT, TimingOut(remote.clone()), CachePolicy::default()).unwrap()
    }

    #[test]
    fn timed_out_refresh_serves_the_stale_copy() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("a.jpg"), b"new", at(500));
        let local = dir.path().join("a.jpg");
        fs::write(&local, b"old").unwrap();
        filetime::set_file_mtime(&local, filetime::FileTime::from_system_time(at(0))).unwrap();

        let cache = timing_out_cache(dir.path(), &remote);
        let got = cache.get_media_path("a.jpg").unwrap();
        assert_eq!(got.outcome, CacheOutcome::StaleFallback);
        assert_eq!(fs::read(&got.path).unwrap(), b"old");
    }

    #[test]
    fn timed_out_copy_without_local_copy_is_unavailable() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.put(Path::new(ROOT).join("clip.mp4"), b"frames", at(0));

        let cache = timing_out_cache(dir.path(), &remote);
        match cache.get_media_path("clip.mp4").unwrap_err() {
            CacheError::MediaUnavailable { filename, source } => {
                assert_eq!(filename, "clip.mp4");
                assert!(matches!(*source, CacheError::Timeout { op: "copy", .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("clip.mp4").exists());
    }

    #[test]
    fn timed_out_listing_aborts_sync() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        remote.add_dir(ROOT);
        fs::write(dir.path().join("orphan.jpg"), b"o").unwrap();

        let cache = timing_out_cache(dir.path(), &remote);
        let report = cache.sync_with_remote();
        assert!(report.aborted);
        assert!(report.removed.is_empty());
        assert!(dir.path().join("orphan.jpg").exists());
    }

    #[test]
    fn sync_clears_partials_left_by_abandoned_copies() {
        let dir = tempdir().unwrap();
        let remote = MemRemote::new();
        let cache = cache(dir.path(), &remote);

        let incoming = dir.path().join(INCOMING_DIR);
        fs::create_dir_all(&incoming).unwrap();
        let abandoned = incoming.join("a.mp4.1.part");
        let live = incoming.join("b.mp4.2.part");
        fs::write(&abandoned, b"late bytes").unwrap();
        fs::write(&live, b"being written").unwrap();
        let hour_ago = SystemTime::now() - Duration::from_secs(60 * 60);
        filetime::set_file_mtime(&abandoned, filetime::FileTime::from_system_time(hour_ago))
            .unwrap();

        // Offline remote: the sync pass aborts, the sweep still runs.
        remote.set_offline(true);
        assert!(cache.sync_with_remote().aborted);
        assert!(!abandoned.exists());
        assert!(live.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn new_uses_default_root_and_policy() {
        let dir = tempdir().unwrap();
        let previous = std::env::var_os("XDG_DATA_HOME");
        std::env::set_var("XDG_DATA_HOME", dir.path());
        let opened = MediaCache::new(dir.path().join("share"));
        match previous {
            Some(value) => std::env::set_var("XDG_DATA_HOME", value),
            None => std::env::remove_var("XDG_DATA_HOME"),
        }

        let cache = opened.unwrap();
        assert_eq!(
            cache.cache_root(),
            dir.path().join(paths::APP_DIR).join(paths::CACHE_SUBDIR)
        );
        assert!(cache.cache_root().is_dir());
        assert_eq!(cache.policy(), &CachePolicy::default());
        assert!(!cache.is_remote_accessible());
    }
}
