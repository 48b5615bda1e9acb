use crate::commands::{local_files, CacheContext};
use crate::model::DEFAULT_REMOTE_TIMEOUT;
use crate::remote::RemoteFs;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Abandoned downloads cleared from the incoming folder.
    pub partials_removed: usize,
}

/// Delete cached files not accessed for more than `days_old` days, measured
/// from `now`. A file accessed exactly at the cutoff is kept.
///
/// Every error is logged and swallowed; this runs from a background timer.
pub fn run<R: RemoteFs>(ctx: &CacheContext<R>, days_old: u64, now: SystemTime) -> CleanupReport {
    let mut report = CleanupReport {
        partials_removed: sweep_abandoned(ctx, now),
        ..Default::default()
    };
    let age = Duration::from_secs(days_old.saturating_mul(24 * 60 * 60));
    let Some(cutoff) = now.checked_sub(age) else {
        return report;
    };
    let cutoff = FileTime::from_system_time(cutoff);

    let files = match local_files(&ctx.cache_root) {
        Ok(files) => files,
        Err(err) => {
            warn!(cache = %ctx.cache_root.display(), error = %err, "cache cleanup could not list files");
            return report;
        }
    };

    for (name, meta) in files {
        if FileTime::from_last_access_time(&meta) >= cutoff {
            continue;
        }
        let path = ctx.local_path(&name);
        let removed = ctx.with_lock(&name, || {
            // A fetch may have replaced the file while we waited.
            let meta = fs::metadata(&path)?;
            if FileTime::from_last_access_time(&meta) >= cutoff {
                return Ok(false);
            }
            fs::remove_file(&path).map(|()| true)
        });
        match removed {
            Ok(true) => {
                info!(filename = %name, "cache cleanup removed unused file");
                report.removed.push(name);
            }
            Ok(false) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(filename = %name, error = %err, "cache cleanup could not remove file");
                report.failed.push((name, err.to_string()));
            }
        }
    }

    report
}

/// Clear part files left behind by copies that timed out. A live copy keeps
/// touching its part file, so anything untouched for longer than the remote
/// timeout has no writer left.
pub fn sweep_abandoned<R: RemoteFs>(ctx: &CacheContext<R>, now: SystemTime) -> usize {
    let grace = ctx.policy.remote_timeout.unwrap_or(DEFAULT_REMOTE_TIMEOUT);
    match now.checked_sub(grace) {
        Some(older_than) => sweep_partials(&ctx.incoming_dir(), Some(older_than)),
        None => 0,
    }
}

/// Remove part files from `incoming`, all of them when `older_than` is
/// `None`. Returns how many were removed.
pub fn sweep_partials(incoming: &Path, older_than: Option<SystemTime>) -> usize {
    let entries = match fs::read_dir(incoming) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(limit) = older_than {
            match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) if modified < limit => {}
                _ => continue,
            }
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed abandoned partial download");
                removed += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not remove partial download")
            }
        }
    }
    removed
}
