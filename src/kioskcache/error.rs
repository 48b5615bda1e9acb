use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid media filename: {0:?}")]
    InvalidFilename(String),

    #[error("No remote media path configured")]
    RemoteNotConfigured,

    #[error("Remote file not found: {}", .0.display())]
    RemoteNotFound(PathBuf),

    #[error("Remote path unreachable: {}: {source}", .path.display())]
    RemoteUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote {op} timed out after {}s: {}", .after.as_secs(), .path.display())]
    Timeout {
        op: &'static str,
        path: PathBuf,
        after: Duration,
    },

    #[error("File {filename} not available")]
    MediaUnavailable {
        filename: String,
        #[source]
        source: Box<CacheError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
