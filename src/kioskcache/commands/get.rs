use crate::commands::CacheContext;
use crate::error::{CacheError, Result};
use crate::model::{CacheOutcome, CachedMedia};
use crate::remote::RemoteFs;
use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Resolve `filename` to a ready-to-play local path.
///
/// Served from the cache when the local copy is fresh, refreshed from the
/// remote otherwise. If the refresh fails but an older copy exists, that copy
/// is served; only with no local copy at all does this return
/// [`CacheError::MediaUnavailable`].
pub fn run<R: RemoteFs>(ctx: &CacheContext<R>, filename: &str) -> Result<CachedMedia> {
    validate_filename(filename)?;
    ctx.with_lock(filename, || resolve(ctx, filename))
}

fn resolve<R: RemoteFs>(ctx: &CacheContext<R>, filename: &str) -> Result<CachedMedia> {
    let local_path = ctx.local_path(filename);

    if local_path.is_file() && !is_stale(ctx, filename, &local_path) {
        info!(filename, "cache hit");
        return Ok(CachedMedia {
            path: local_path,
            outcome: CacheOutcome::Hit,
        });
    }

    info!(filename, "cache miss, fetching from remote");
    match fetch(ctx, filename, &local_path) {
        Ok(()) => Ok(CachedMedia {
            path: local_path,
            outcome: CacheOutcome::Refreshed,
        }),
        Err(err) => {
            warn!(filename, error = %err, "fetch failed");
            if local_path.is_file() {
                warn!(filename, "serving stale cached copy");
                return Ok(CachedMedia {
                    path: local_path,
                    outcome: CacheOutcome::StaleFallback,
                });
            }
            error!(filename, error = %err, "media unavailable, no cached copy");
            Err(CacheError::MediaUnavailable {
                filename: filename.to_string(),
                source: Box::new(err),
            })
        }
    }
}

/// Cached files are keyed by bare filename and live directly in the cache
/// root, so anything that could name another location is refused.
pub fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || Path::new(filename).file_name().map(|n| n != filename).unwrap_or(true);
    if invalid {
        return Err(CacheError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// The local copy is stale when the remote is newer by more than the grace
/// window. Any failure to read either timestamp counts as fresh.
fn is_stale<R: RemoteFs>(ctx: &CacheContext<R>, filename: &str, local_path: &Path) -> bool {
    let Ok(remote_path) = ctx.remote_path(filename) else {
        return false;
    };
    let local_modified = match fs::metadata(local_path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    match ctx.remote.modified(&remote_path) {
        Ok(remote_modified) => {
            is_outdated(local_modified, remote_modified, ctx.policy.stale_grace)
        }
        Err(_) => false,
    }
}

pub fn is_outdated(local: SystemTime, remote: SystemTime, grace: Duration) -> bool {
    match local.checked_add(grace) {
        Some(limit) => remote > limit,
        None => false,
    }
}

/// Copy into `.incoming` under a unique name, stamp the remote mtime, then
/// rename over the final path. Readers see either the old file or the new
/// one, never a partial write.
fn fetch<R: RemoteFs>(ctx: &CacheContext<R>, filename: &str, local_path: &Path) -> Result<()> {
    let remote_path = ctx.remote_path(filename)?;
    let incoming = ctx.incoming_dir();
    fs::create_dir_all(&incoming)?;
    let part = incoming.join(format!("{}.{}.part", filename, Uuid::new_v4()));

    let result = ctx
        .remote
        .copy_file(&remote_path, &part)
        .and_then(|modified| {
            filetime::set_file_mtime(&part, FileTime::from_system_time(modified))?;
            fs::rename(&part, local_path)?;
            Ok(())
        });

    if result.is_err() {
        let _ = fs::remove_file(&part);
    } else {
        info!(filename, path = %local_path.display(), "downloaded to cache");
    }
    result
}
