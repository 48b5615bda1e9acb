use crate::commands::{local_files, CacheContext};
use crate::error::Result;
use crate::model::{CachedEntry, MediaKind};
use crate::remote::RemoteFs;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub cache_root: PathBuf,
    pub remote_root: PathBuf,
    pub remote_accessible: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub entries: Vec<CachedEntry>,
}

impl StatusReport {
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

pub fn run<R: RemoteFs>(ctx: &CacheContext<R>, last_sync: Option<DateTime<Utc>>) -> Result<StatusReport> {
    let entries = local_files(&ctx.cache_root)?
        .into_iter()
        .map(|(name, meta)| {
            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();
            CachedEntry {
                kind: MediaKind::from_path(&name),
                size: meta.len(),
                modified,
                name,
            }
        })
        .collect();

    Ok(StatusReport {
        cache_root: ctx.cache_root.clone(),
        remote_root: ctx.remote_root.clone(),
        remote_accessible: ctx.remote_configured() && ctx.remote.dir_exists(&ctx.remote_root),
        last_sync,
        entries,
    })
}
