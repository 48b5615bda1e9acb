//! # Configuration
//!
//! Settings live in `config.json` inside the config directory
//! (`directories::ProjectDirs`, overridable from the command line). A missing
//! file means defaults; a missing key means that key's default.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `remote_path` | `""` | Shared media folder (or the folder holding the single media file) |
//! | `server` | `localhost` | Master database host; any other host makes this node a slave |
//! | `folder_mode` | `true` | Slideshow folder rather than a single file |
//! | `media_file` | `""` | File shown in single-file mode |
//! | `stale_grace_secs` | `30` | Remote newer than local by more than this triggers a refresh |
//! | `sync_interval_secs` | `300` | Minimum spacing between reconciliation passes |
//! | `cleanup_days` | `30` | Cached files unused this long are evicted |
//! | `remote_timeout_secs` | `30` | Bound on each remote filesystem call, `0` for none |
//! | `cache_dir` | unset | Replaces `<LocalAppData>/DBNext/MediaCache` |
//! | `log_dir` | unset | Replaces `<LocalAppData>/DBNext/logs` |

use crate::error::{CacheError, Result};
use crate::model::{CachePolicy, DEFAULT_CLEANUP_DAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

pub const KEYS: &[&str] = &[
    "remote_path",
    "server",
    "folder_mode",
    "media_file",
    "stale_grace_secs",
    "sync_interval_secs",
    "cleanup_days",
    "remote_timeout_secs",
    "cache_dir",
    "log_dir",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub remote_path: String,
    pub server: String,
    pub folder_mode: bool,
    pub media_file: String,
    pub stale_grace_secs: u64,
    pub sync_interval_secs: u64,
    pub cleanup_days: u64,
    pub remote_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            remote_path: String::new(),
            server: "localhost".to_string(),
            folder_mode: true,
            media_file: String::new(),
            stale_grace_secs: policy.stale_grace.as_secs(),
            sync_interval_secs: policy.sync_interval.as_secs(),
            cleanup_days: DEFAULT_CLEANUP_DAYS,
            remote_timeout_secs: policy.remote_timeout.map(|d| d.as_secs()).unwrap_or(0),
            cache_dir: None,
            log_dir: None,
        }
    }
}

impl CacheConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: CacheConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            stale_grace: Duration::from_secs(self.stale_grace_secs),
            sync_interval: Duration::from_secs(self.sync_interval_secs),
            remote_timeout: match self.remote_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "remote_path" => self.remote_path.clone(),
            "server" => self.server.clone(),
            "folder_mode" => self.folder_mode.to_string(),
            "media_file" => self.media_file.clone(),
            "stale_grace_secs" => self.stale_grace_secs.to_string(),
            "sync_interval_secs" => self.sync_interval_secs.to_string(),
            "cleanup_days" => self.cleanup_days.to_string(),
            "remote_timeout_secs" => self.remote_timeout_secs.to_string(),
            "cache_dir" => display_opt(&self.cache_dir),
            "log_dir" => display_opt(&self.log_dir),
            _ => return None,
        };
        Some(value)
    }

    /// Set a key from its string form. An empty value clears the optional
    /// directory overrides.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "remote_path" => self.remote_path = value.to_string(),
            "server" => self.server = value.trim().to_string(),
            "folder_mode" => self.folder_mode = parse(key, value)?,
            "media_file" => self.media_file = value.to_string(),
            "stale_grace_secs" => self.stale_grace_secs = parse(key, value)?,
            "sync_interval_secs" => self.sync_interval_secs = parse(key, value)?,
            "cleanup_days" => self.cleanup_days = parse(key, value)?,
            "remote_timeout_secs" => self.remote_timeout_secs = parse(key, value)?,
            "cache_dir" => self.cache_dir = path_opt(value),
            "log_dir" => self.log_dir = path_opt(value),
            _ => return Err(CacheError::Config(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CacheError::Config(format!("Invalid value for {}: {:?}", key, value)))
}

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn path_opt(value: &str) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.server, "localhost");
        assert_eq!(config.stale_grace_secs, 30);
        assert_eq!(config.sync_interval_secs, 300);
        assert_eq!(config.cleanup_days, 30);
        assert_eq!(config.policy(), CachePolicy::default());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = CacheConfig::load(dir.path().join("absent")).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = CacheConfig::default();
        config.set("remote_path", r"\\CS1200-1\Pubblicita").unwrap();
        config.set("cleanup_days", "7").unwrap();
        config.save(dir.path()).unwrap();

        let loaded = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.remote_path, r"\\CS1200-1\Pubblicita");
        assert_eq!(loaded.cleanup_days, 7);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"server": "192.168.1.100"}"#).unwrap();

        let loaded = CacheConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.server, "192.168.1.100");
        assert_eq!(loaded.sync_interval_secs, 300);
        assert!(loaded.folder_mode);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let mut config = CacheConfig::default();
        config.set("remote_timeout_secs", "0").unwrap();
        assert_eq!(config.policy().remote_timeout, None);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = CacheConfig::default();
        assert!(matches!(
            config.set("cleanup_days", "soon"),
            Err(CacheError::Config(_))
        ));
        assert!(matches!(
            config.set("colour", "blue"),
            Err(CacheError::Config(_))
        ));
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_every_key_is_readable() {
        let config = CacheConfig::default();
        for key in KEYS {
            assert!(config.get(key).is_some(), "{key} not readable");
        }
        assert_eq!(config.get("nope"), None);
    }

    #[test]
    fn test_empty_value_clears_directory_override() {
        let mut config = CacheConfig::default();
        config.set("cache_dir", "/var/cache/kiosk").unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/kiosk")));
        config.set("cache_dir", "").unwrap();
        assert_eq!(config.cache_dir, None);
    }
}
