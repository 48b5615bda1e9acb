use crate::commands::{local_files, CacheContext};
use crate::model::is_media_file;
use crate::remote::RemoteFs;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub removed: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// The remote could not be listed, so nothing was touched.
    pub aborted: bool,
}

/// Delete cached files whose name no longer exists in the remote root.
///
/// Never deletes anything unless the remote folder was listed successfully.
pub fn run<R: RemoteFs>(ctx: &CacheContext<R>) -> SyncReport {
    let mut report = SyncReport::default();

    if !ctx.remote_configured() || !ctx.remote.dir_exists(&ctx.remote_root) {
        warn!(remote = %ctx.remote_root.display(), "remote not reachable, sync skipped");
        report.aborted = true;
        return report;
    }

    let remote_names: HashSet<String> = match ctx.remote.list_files(&ctx.remote_root) {
        Ok(names) => names.into_iter().filter(|n| is_media_file(n)).collect(),
        Err(err) => {
            warn!(remote = %ctx.remote_root.display(), error = %err, "remote listing failed, sync skipped");
            report.aborted = true;
            return report;
        }
    };

    let local = match local_files(&ctx.cache_root) {
        Ok(files) => files,
        Err(err) => {
            warn!(cache = %ctx.cache_root.display(), error = %err, "could not list cache root");
            report.aborted = true;
            return report;
        }
    };

    for (name, _) in local {
        if remote_names.contains(&name) {
            continue;
        }
        match ctx.with_lock(&name, || fs::remove_file(ctx.local_path(&name))) {
            Ok(()) => {
                info!(filename = %name, "removed file no longer on remote");
                report.removed.push(name);
            }
            Err(err) => {
                warn!(filename = %name, error = %err, "could not remove orphaned file");
                report.failed.push((name, err.to_string()));
            }
        }
    }

    report
}

/// Rate limiter for [`run`]: remembers when the last pass happened.
#[derive(Debug)]
pub struct SyncGate {
    interval: Duration,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl SyncGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sync: Mutex::new(None),
        }
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self
            .last_sync
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a pass at `now` if the interval has elapsed. The cursor only
    /// moves when this returns true.
    pub fn try_claim(&self, now: DateTime<Utc>) -> bool {
        let mut last = self
            .last_sync
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let due = match *last {
            None => true,
            Some(prev) => match (now - prev).to_std() {
                Ok(elapsed) => elapsed >= self.interval,
                // Clock went backwards.
                Err(_) => false,
            },
        };
        if due {
            *last = Some(now);
        } else {
            debug!(last = ?*last, "sync not due yet");
        }
        due
    }
}
