use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kioskcache", version)]
#[command(about = "Local media cache for signage display nodes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Remote media folder (overrides config)
    #[arg(long, global = true, env = "KIOSKCACHE_REMOTE")]
    pub remote: Option<String>,

    /// Cache root (overrides config and the default location)
    #[arg(long, global = true, env = "KIOSKCACHE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding config.json
    #[arg(long, global = true, env = "KIOSKCACHE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Directory for app.log
    #[arg(long, global = true, env = "KIOSKCACHE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the local path for a media file, fetching it if needed
    Get {
        /// File name inside the remote folder
        filename: String,
    },

    /// Cache every slideshow file of a folder
    Prime {
        /// Folder to cache (defaults to the remote folder)
        folder: Option<PathBuf>,
    },

    /// Remove cached files that are gone from the remote
    Sync,

    /// Evict cached files not used for a number of days
    Cleanup {
        /// Age threshold in days (defaults to config)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Show remote reachability and cache contents
    #[command(alias = "st")]
    Status,

    /// Keep the cache warm the way a display does
    Watch {
        /// Seconds between media refresh ticks
        #[arg(long, default_value_t = 60)]
        interval: u64,

        /// Stop after this many ticks (runs forever if omitted)
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Get or set configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommand>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show all settings
    Show,
    /// Print one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
}
