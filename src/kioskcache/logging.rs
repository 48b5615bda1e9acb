//! Logging setup for hosts of the cache.
//!
//! Two sinks:
//! - `<log dir>/app.log`, appended across runs, plain text, filtered by
//!   `RUST_LOG` (default `info`)
//! - stderr, coloured, `warn` by default or `debug` when verbose
//!
//! The library itself only emits `tracing` events; nothing is installed
//! unless the host calls [`init_logging`].

use crate::paths::LOG_FILE;
use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Keeps the file writer alive; dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init_logging(log_dir: &Path, verbose: bool) -> io::Result<LoggingGuard> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false)
        .with_filter(file_filter);

    let console_level = if verbose { "debug" } else { "warn" };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(EnvFilter::new(console_level));

    // A second init (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
