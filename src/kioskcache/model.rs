use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions played as still images in a slideshow.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Extensions played as video clips in a slideshow.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "wmv", "webm", "mkv", "mov"];

/// Remote files newer than the local copy by more than this are refetched.
pub const STALE_GRACE: Duration = Duration::from_secs(30);

/// Minimum spacing between two reconciliation passes.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_CLEANUP_DAYS: u64 = 30;

/// Cleanup cadence used by long-running hosts.
pub const CLEANUP_TICK: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file by extension (case-insensitive). `None` for anything
    /// outside the slideshow allow-list.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

pub fn is_media_file<P: AsRef<Path>>(path: P) -> bool {
    MediaKind::from_path(path).is_some()
}

/// How a ready-to-play path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Local copy present and fresh; the remote file was not copied.
    Hit,
    /// Local copy was missing or stale and has been replaced from the remote.
    Refreshed,
    /// Refresh failed; an older local copy is served instead.
    StaleFallback,
}

impl std::fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Refreshed => "refreshed",
            CacheOutcome::StaleFallback => "stale",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMedia {
    pub path: PathBuf,
    pub outcome: CacheOutcome,
}

/// Tunables for a [`crate::api::MediaCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub stale_grace: Duration,
    pub sync_interval: Duration,
    /// `None` lets remote calls block indefinitely.
    pub remote_timeout: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_grace: STALE_GRACE,
            sync_interval: SYNC_INTERVAL,
            remote_timeout: Some(DEFAULT_REMOTE_TIMEOUT),
        }
    }
}

/// A file currently held in the cache root, as shown by `status`.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub kind: Option<MediaKind>,
}
