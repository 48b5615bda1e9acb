//! Well-known local directories. The cache root is fixed per user:
//! `<LocalAppData>/DBNext/MediaCache` (`~/.local/share/DBNext/MediaCache` on
//! Linux).

use crate::error::{CacheError, Result};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

pub const APP_DIR: &str = "DBNext";
pub const CACHE_SUBDIR: &str = "MediaCache";
pub const LOG_SUBDIR: &str = "logs";
pub const LOG_FILE: &str = "app.log";

fn local_app_data() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.data_local_dir().join(APP_DIR))
        .ok_or_else(|| {
            CacheError::Config("Could not determine the local application data directory".into())
        })
}

pub fn default_cache_root() -> Result<PathBuf> {
    Ok(local_app_data()?.join(CACHE_SUBDIR))
}

pub fn default_log_dir() -> Result<PathBuf> {
    Ok(local_app_data()?.join(LOG_SUBDIR))
}

pub fn default_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", APP_DIR, "kioskcache")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| CacheError::Config("Could not determine the config directory".into()))
}
